//! Backup channel: records encoded into the cell's tag list
//!
//! A tag of the form `nbgrader:<base64 of UTF-8 JSON>` survives hosts that
//! strip unknown metadata but keep tags. It is only ever a last-resort read.

use crate::error::BackupTagError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use nbg_schema::GradingRecord;
use serde_json::Value;

/// Marker every backup tag starts with
pub const BACKUP_TAG_PREFIX: &str = "nbgrader:";

/// Whether a tag is a backup tag
#[inline]
#[must_use]
pub fn is_backup_tag(tag: &str) -> bool {
    tag.starts_with(BACKUP_TAG_PREFIX)
}

/// Encode a record as a backup tag
#[must_use]
pub fn encode_backup_tag(record: &GradingRecord) -> String {
    let json = record.to_value().to_string();
    format!("{}{}", BACKUP_TAG_PREFIX, STANDARD.encode(json.as_bytes()))
}

/// Decode a backup tag into the record and the raw JSON it carried
///
/// # Errors
/// Each decoding stage has its own [`BackupTagError`] variant
pub fn decode_backup_tag(tag: &str) -> Result<(GradingRecord, Value), BackupTagError> {
    let encoded = tag
        .strip_prefix(BACKUP_TAG_PREFIX)
        .ok_or_else(|| BackupTagError::MissingPrefix(tag.to_string()))?;
    let bytes = STANDARD.decode(encoded.trim())?;
    let text = String::from_utf8(bytes)?;
    let raw: Value = serde_json::from_str(&text)?;
    let record = GradingRecord::from_value(&raw).ok_or(BackupTagError::NotARecord)?;
    Ok((record, raw))
}

/// First backup tag in a JSON tag list
#[must_use]
pub fn find_backup_tag(tags: &[Value]) -> Option<&str> {
    tags.iter().filter_map(Value::as_str).find(|t| is_backup_tag(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> GradingRecord {
        GradingRecord {
            schema_version: Some(3),
            grade_id: Some("cell-abcdefabcdef".to_string()),
            locked: Some(true),
            ..GradingRecord::default()
        }
    }

    #[test]
    fn encoded_tag_decodes_to_same_record() {
        let tag = encode_backup_tag(&record());
        assert!(is_backup_tag(&tag));

        let (decoded, raw) = decode_backup_tag(&tag).unwrap();
        assert_eq!(decoded, record());
        assert_eq!(raw, record().to_value());
    }

    #[test]
    fn decodes_hand_written_tag() {
        // base64 of {"schema_version":3,"grade":false,"locked":true}
        let tag = "nbgrader:eyJzY2hlbWFfdmVyc2lvbiI6MywiZ3JhZGUiOmZhbHNlLCJsb2NrZWQiOnRydWV9";
        let (decoded, _) = decode_backup_tag(tag).unwrap();
        assert_eq!(decoded.grade, Some(false));
        assert_eq!(decoded.locked, Some(true));
    }

    #[test]
    fn decode_failures_are_typed() {
        assert!(matches!(
            decode_backup_tag("other:abc"),
            Err(BackupTagError::MissingPrefix(_))
        ));
        assert!(matches!(
            decode_backup_tag("nbgrader:%%%"),
            Err(BackupTagError::Base64(_))
        ));
        let not_json = format!("nbgrader:{}", STANDARD.encode("not json"));
        assert!(matches!(decode_backup_tag(&not_json), Err(BackupTagError::Json(_))));
        let not_object = format!("nbgrader:{}", STANDARD.encode("[1,2]"));
        assert!(matches!(
            decode_backup_tag(&not_object),
            Err(BackupTagError::NotARecord)
        ));
    }

    #[test]
    fn find_skips_other_tags() {
        let tags = vec![json!("raises-exception"), json!(3), json!("nbgrader:e30=")];
        assert_eq!(find_backup_tag(&tags), Some("nbgrader:e30="));
        assert_eq!(find_backup_tag(&[json!("plain")]), None);
    }
}
