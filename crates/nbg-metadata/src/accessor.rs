//! Record accessor and mutator
//!
//! The only translator between a cell's untyped [`MetadataBag`] and the typed
//! [`GradingRecord`].
//!
//! # Read order
//!
//! 1. primary namespace (`custom.metadata.nbgrader` or `metadata.nbgrader`)
//! 2. the other namespace (legacy)
//! 3. direct `nbgrader` key
//! 4. backup tag in the tag list
//!
//! First match wins. Writes always target the primary namespace and return
//! a new, key-sorted bag; the caller commits it through the host.

use crate::backup::{decode_backup_tag, encode_backup_tag, find_backup_tag, is_backup_tag};
use crate::bag::MetadataBag;
use crate::error::{BackupTagError, MetadataResult};
use crate::namespace::NamespaceMode;
use nbg_schema::{GradingRecord, NBGRADER_KEY};
use serde_json::Value;

/// Location a record was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordSource {
    /// Active namespace
    Primary,
    /// The inactive namespace
    Legacy,
    /// Unnamespaced `nbgrader` key
    Direct,
    /// Decoded from a backup tag
    BackupTag,
}

/// A record together with the raw JSON it was parsed from
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Typed view
    pub record: GradingRecord,
    /// JSON as stored, used for change detection
    pub raw: Value,
    /// Where it was found
    pub source: RecordSource,
}

/// Options for [`write_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Also refresh the `nbgrader:` backup tag in the primary tag list
    pub mirror_backup_tag: bool,
}

/// Read the grading record of a cell
///
/// Values that are not JSON objects are skipped. A malformed backup tag is
/// logged and treated as "no record".
#[must_use]
pub fn read(bag: &MetadataBag, mode: NamespaceMode) -> Option<StoredRecord> {
    let namespaced = [
        (mode.record_path(), RecordSource::Primary),
        (mode.legacy().record_path(), RecordSource::Legacy),
        (NBGRADER_KEY.to_string(), RecordSource::Direct),
    ];

    for (path, source) in namespaced {
        let Some(raw) = bag.get_path(&path) else {
            continue;
        };
        match GradingRecord::from_value(raw) {
            Some(record) => {
                return Some(StoredRecord {
                    record,
                    raw: raw.clone(),
                    source,
                })
            }
            None => tracing::debug!("Ignoring non-object value at {}", path),
        }
    }

    match read_backup(bag) {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!("Failed to decode backup tag: {}", err);
            None
        }
    }
}

/// Read only the backup channel, surfacing decode failures
///
/// # Errors
/// Returns the [`BackupTagError`] of the first backup tag if it cannot be
/// decoded
pub fn read_backup(bag: &MetadataBag) -> Result<Option<StoredRecord>, BackupTagError> {
    let Some(tags) = tag_list(bag) else {
        return Ok(None);
    };
    let Some(tag) = find_backup_tag(tags) else {
        return Ok(None);
    };

    let (record, raw) = decode_backup_tag(tag)?;
    tracing::debug!("Restored metadata from tag: {}", raw);
    Ok(Some(StoredRecord {
        record,
        raw,
        source: RecordSource::BackupTag,
    }))
}

/// Write or delete the grading record of a cell
///
/// `None` deletes the record. See [`write_with`].
///
/// # Errors
/// Propagates [`crate::MetadataError::PathConflict`]; the input bag is
/// untouched on failure
pub fn write(
    bag: &MetadataBag,
    record: Option<&GradingRecord>,
    mode: NamespaceMode,
) -> MetadataResult<MetadataBag> {
    write_with(bag, record, mode, WriteOptions::default())
}

/// Write or delete the grading record of a cell, with options
///
/// Works on a deep copy of `bag`. Only the defined fields of the record are
/// serialized and every object key is sorted before the copy is returned.
/// Deleting removes the key entirely, along with stale copies in the legacy
/// and direct locations and any backup tags, so that a cleared cell does not
/// come back through a fallback read.
///
/// # Errors
/// Propagates [`crate::MetadataError::PathConflict`]; the input bag is
/// untouched on failure
pub fn write_with(
    bag: &MetadataBag,
    record: Option<&GradingRecord>,
    mode: NamespaceMode,
    options: WriteOptions,
) -> MetadataResult<MetadataBag> {
    let mut updated = bag.clone();

    match record {
        Some(record) => {
            updated.set_path(&mode.record_path(), record.to_value())?;
            if options.mirror_backup_tag {
                mirror_tag(&mut updated, record, mode)?;
            }
        }
        None => {
            updated.remove_path(&mode.record_path());
            updated.remove_path(&mode.legacy().record_path());
            updated.remove_path(NBGRADER_KEY);
            strip_backup_tags(&mut updated);
        }
    }

    Ok(updated.sorted())
}

const TAG_PATHS: [&str; 3] = ["custom.metadata.tags", "metadata.tags", "tags"];

fn tag_list(bag: &MetadataBag) -> Option<&[Value]> {
    TAG_PATHS
        .iter()
        .find_map(|path| bag.get_path(path).and_then(Value::as_array))
        .map(Vec::as_slice)
}

fn strip_backup_tags(bag: &mut MetadataBag) {
    for path in TAG_PATHS {
        if let Some(tags) = bag.array_at_mut(path) {
            tags.retain(|t| !t.as_str().is_some_and(is_backup_tag));
        }
    }
}

fn mirror_tag(
    bag: &mut MetadataBag,
    record: &GradingRecord,
    mode: NamespaceMode,
) -> MetadataResult<()> {
    let path = mode.tags_path();
    let tag = Value::String(encode_backup_tag(record));
    if let Some(tags) = bag.array_at_mut(&path) {
        tags.retain(|t| !t.as_str().is_some_and(is_backup_tag));
        tags.push(tag);
        return Ok(());
    }
    bag.set_path(&path, Value::Array(vec![tag]))
}
