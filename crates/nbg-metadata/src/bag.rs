//! Untyped cell metadata
//!
//! The host hands every cell an opaque JSON object. [`MetadataBag`] wraps it
//! with dotted-path access and the recursive key sort applied before writes.

use crate::error::{MetadataError, MetadataResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A cell's opaque metadata object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataBag(Map<String, Value>);

impl MetadataBag {
    /// Empty bag
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap an existing map
    #[inline]
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Wrap a JSON value, which must be an object
    ///
    /// # Errors
    /// Returns [`MetadataError::NotAnObject`] for any other JSON type
    pub fn from_value(value: Value) -> MetadataResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(MetadataError::NotAnObject),
        }
    }

    /// Borrow the underlying map
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Unwrap into the underlying map
    #[inline]
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Unwrap into a JSON object value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Whether the bag has no keys
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get value at path (dot notation)
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Set value at path (dot notation)
    ///
    /// Creates intermediate objects as needed. Unlike a blind overwrite, an
    /// intermediate that already holds a non-object value is an error so
    /// that unrelated host data is never clobbered.
    ///
    /// # Errors
    /// Returns [`MetadataError::PathConflict`] naming the offending segment
    pub fn set_path(&mut self, path: &str, value: Value) -> MetadataResult<()> {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return Ok(());
        };

        let mut current = &mut self.0;
        for segment in parents {
            let entry = current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = entry
                .as_object_mut()
                .ok_or_else(|| MetadataError::path_conflict(path, *segment))?;
        }

        current.insert((*last).to_string(), value);
        Ok(())
    }

    /// Remove value at path (dot notation), returning it if present
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path.split('.').collect();
        let (last, parents) = segments.split_last()?;

        let mut current = &mut self.0;
        for segment in parents {
            current = current.get_mut(*segment)?.as_object_mut()?;
        }
        current.remove(*last)
    }

    /// Mutable access to a JSON array at path, if one is there
    pub fn array_at_mut(&mut self, path: &str) -> Option<&mut Vec<Value>> {
        let segments: Vec<&str> = path.split('.').collect();
        let (last, parents) = segments.split_last()?;

        let mut current = &mut self.0;
        for segment in parents {
            current = current.get_mut(*segment)?.as_object_mut()?;
        }
        current.get_mut(*last)?.as_array_mut()
    }

    /// Copy of the bag with all object keys sorted alphabetically, recursively
    #[must_use]
    pub fn sorted(&self) -> Self {
        match sort_keys(&Value::Object(self.0.clone())) {
            Value::Object(map) => Self(map),
            _ => Self::new(),
        }
    }
}

impl From<Map<String, Value>> for MetadataBag {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Recursively sort object keys, descending into arrays
#[must_use]
pub fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}
