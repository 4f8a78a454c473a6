//! Key layout inside a bucket.
//!
//! A record's objects live under a prefix that always ends with `/`:
//!
//! ```text
//! doc@example.com_3fa9/                          placeholder
//! doc@example.com_3fa9/1729250000123456-rec.wav  upload
//! doc@example.com_3fa9/summary.json              report (output bucket)
//! ```

use chrono::{DateTime, Utc};

use crate::error::StorageError;

pub const SEPARATOR: char = '/';
pub const REPORT_FILE: &str = "summary.json";

/// Turn a logical identifier into a directory prefix.
///
/// Surrounding whitespace and leading separators are dropped and a trailing
/// separator is appended when missing, so `"foo"` and `"foo/"` map to the
/// same prefix. Only an empty identifier is rejected.
pub fn normalize_prefix(logical_key: &str) -> Result<String, StorageError> {
    let trimmed = logical_key.trim().trim_start_matches(SEPARATOR);
    if trimmed.is_empty() {
        return Err(StorageError::InvalidInput("prefix cannot be empty".to_string()));
    }
    if trimmed.ends_with(SEPARATOR) {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}{SEPARATOR}"))
    }
}

/// Reduce a client-supplied file name to its last path component.
pub fn file_leaf(file_name: &str) -> Result<&str, StorageError> {
    let leaf = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if leaf.is_empty() || leaf == "." || leaf == ".." {
        return Err(StorageError::InvalidInput(format!(
            "unusable file name: {file_name:?}"
        )));
    }
    Ok(leaf)
}

/// `<prefix><micros>-<leaf>`; `prefix` must already be normalized.
pub fn upload_key(
    prefix: &str,
    at: DateTime<Utc>,
    file_name: &str,
) -> Result<String, StorageError> {
    let leaf = file_leaf(file_name)?;
    Ok(format!("{prefix}{}-{leaf}", at.timestamp_micros()))
}

/// A visit's logical key: the patient email plus a short random suffix.
pub fn visit_token(email: &str) -> String {
    let suffix: [u8; 2] = rand::random();
    format!("{}_{}", email.trim(), hex::encode(suffix))
}

pub fn report_key(visit_prefix: &str) -> Result<String, StorageError> {
    Ok(format!("{}{REPORT_FILE}", normalize_prefix(visit_prefix)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalization_is_idempotent() {
        assert_eq!(normalize_prefix("foo").unwrap(), "foo/");
        assert_eq!(normalize_prefix("foo/").unwrap(), "foo/");
        assert_eq!(
            normalize_prefix(" /doc@example.com ").unwrap(),
            "doc@example.com/"
        );
        let once = normalize_prefix("a/b").unwrap();
        assert_eq!(normalize_prefix(&once).unwrap(), once);
    }

    #[test]
    fn empty_prefix_rejected() {
        assert!(normalize_prefix("").is_err());
        assert!(normalize_prefix(" // ").is_err());
    }

    #[test]
    fn upload_key_is_timestamp_qualified() {
        let at = Utc.timestamp_opt(1_700_000_000, 5_000).unwrap();
        let key = upload_key("doc@example.com/", at, "rec.wav").unwrap();
        assert_eq!(key, "doc@example.com/1700000000000005-rec.wav");
    }

    #[test]
    fn upload_key_strips_directories() {
        let at = Utc.timestamp_opt(1, 0).unwrap();
        let key = upload_key("p/", at, "../../etc/passwd").unwrap();
        assert_eq!(key, "p/1000000-passwd");
        let key = upload_key("p/", at, r"C:\tmp\rec.ogg").unwrap();
        assert_eq!(key, "p/1000000-rec.ogg");
        assert!(upload_key("p/", at, "dir/").is_err());
    }

    #[test]
    fn visit_token_shape() {
        let token = visit_token("doc@example.com");
        let (email, suffix) = token.rsplit_once('_').unwrap();
        assert_eq!(email, "doc@example.com");
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn report_key_under_visit() {
        assert_eq!(report_key("visit123").unwrap(), "visit123/summary.json");
    }
}
