//! Grade identifiers
//!
//! Provides [`GradeId`], a validated identifier matching `[A-Za-z0-9_-]+`,
//! and the [`IdSource`] generators used to mint fresh ones of the shape
//! `<prefix>-<12 lowercase hex>`.

use crate::error::SchemaError;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use regex::Regex;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Prefix used by nbgrader for generated identifiers
pub const DEFAULT_ID_PREFIX: &str = "cell";

/// Random bytes per generated identifier (12 hex characters)
const ID_BYTES: usize = 6;

static GRADE_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("grade_id pattern is valid"));

/// Check an identifier against `[A-Za-z0-9_-]+`
#[inline]
#[must_use]
pub fn is_valid_grade_id(id: &str) -> bool {
    GRADE_ID_PATTERN.is_match(id)
}

/// A validated grade identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GradeId(String);

impl GradeId {
    /// Validate and wrap an identifier
    ///
    /// # Errors
    /// Returns [`SchemaError::InvalidGradeId`] if the string is empty or has
    /// characters outside `[A-Za-z0-9_-]`
    pub fn parse(id: &str) -> Result<Self, SchemaError> {
        if is_valid_grade_id(id) {
            Ok(Self(id.to_string()))
        } else {
            Err(SchemaError::InvalidGradeId(id.to_string()))
        }
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the owned string
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    fn from_random(prefix: &str, bytes: [u8; ID_BYTES]) -> Self {
        Self(format!("{}-{}", prefix, hex::encode(bytes)))
    }
}

impl Display for GradeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GradeId {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for GradeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`
///
/// Returns `None` for the empty string, which cannot be repaired into an
/// identifier.
#[must_use]
pub fn sanitize(id: &str) -> Option<GradeId> {
    if id.is_empty() {
        return None;
    }
    let cleaned: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    Some(GradeId(cleaned))
}

/// Source of fresh identifiers
///
/// Generated identifiers are only collision-resistant; callers that need
/// uniqueness within a document must check against the identifiers already
/// in use.
pub trait IdSource {
    /// Produce a new identifier
    fn next_id(&mut self) -> GradeId;
}

/// Identifiers drawn from the thread-local RNG
#[derive(Debug, Clone)]
pub struct RandomIds {
    prefix: String,
}

impl RandomIds {
    /// Generator with the default `cell` prefix
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_ID_PREFIX)
    }

    /// Generator with a custom prefix
    ///
    /// The prefix is sanitized so generated identifiers always validate.
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: clean_prefix(prefix),
        }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for RandomIds {
    fn next_id(&mut self) -> GradeId {
        let mut bytes = [0u8; ID_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        GradeId::from_random(&self.prefix, bytes)
    }
}

/// Reproducible identifiers from a seeded RNG
#[derive(Debug, Clone)]
pub struct SeededIds {
    prefix: String,
    rng: StdRng,
}

impl SeededIds {
    /// Seeded generator with the default prefix
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_prefix(DEFAULT_ID_PREFIX, seed)
    }

    /// Seeded generator with a custom prefix
    #[must_use]
    pub fn with_prefix(prefix: &str, seed: u64) -> Self {
        Self {
            prefix: clean_prefix(prefix),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl IdSource for SeededIds {
    fn next_id(&mut self) -> GradeId {
        let mut bytes = [0u8; ID_BYTES];
        self.rng.fill_bytes(&mut bytes);
        GradeId::from_random(&self.prefix, bytes)
    }
}

/// Generate a `cell-<12 hex>` identifier
#[must_use]
pub fn generate_grade_id() -> GradeId {
    RandomIds::new().next_id()
}

fn clean_prefix(prefix: &str) -> String {
    sanitize(prefix).map_or_else(|| DEFAULT_ID_PREFIX.to_string(), GradeId::into_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_shape() {
        let id = generate_grade_id();
        let s = id.as_str();
        assert_eq!(s.len(), "cell-".len() + 12);
        assert!(s.starts_with("cell-"));
        assert!(s[5..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(is_valid_grade_id(s));
    }

    #[test]
    fn ten_thousand_ids_are_distinct() {
        let mut ids = RandomIds::new();
        let seen: HashSet<_> = (0..10_000).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn seeded_ids_are_reproducible() {
        let mut a = SeededIds::new(42);
        let mut b = SeededIds::new(42);
        assert_eq!(a.next_id(), b.next_id());
        assert_eq!(a.next_id(), b.next_id());
    }

    #[test]
    fn custom_prefix_is_sanitized() {
        let mut ids = RandomIds::with_prefix("my cell");
        assert!(ids.next_id().as_str().starts_with("my_cell-"));

        let mut ids = SeededIds::with_prefix("", 1);
        assert!(ids.next_id().as_str().starts_with("cell-"));
    }

    #[test]
    fn parse_validates_pattern() {
        assert!(GradeId::parse("cell-abc_DEF-123").is_ok());
        assert!(GradeId::parse("").is_err());
        assert!(GradeId::parse("has space").is_err());
        assert!(GradeId::parse("dot.ted").is_err());
        assert!("ok-id".parse::<GradeId>().is_ok());
    }

    #[test]
    fn sanitize_replaces_invalid_chars() {
        assert_eq!(sanitize("q1 part.a").unwrap().as_str(), "q1_part_a");
        assert_eq!(sanitize("ünï").unwrap().as_str(), "_n_");
        assert_eq!(sanitize("fine-id").unwrap().as_str(), "fine-id");
        assert!(sanitize("").is_none());
    }
}
