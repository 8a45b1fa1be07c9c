//! Content hashing for snapshots.
//!
//! The checksum is a SHA256 over the serialized table arrays, so it detects a
//! hand-edited or truncated snapshot without comparing every field.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Compute a SHA256 hash of a serializable value as lowercase hex.
///
/// # Errors
///
/// Returns `Json` if the value cannot be serialized.
pub fn content_hash<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value).map_err(Error::from)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Record {
        id: String,
        value: i32,
    }

    #[test]
    fn test_content_hash_deterministic() {
        let record = Record {
            id: "ws_1".into(),
            value: 42,
        };
        let first = content_hash(&record).unwrap();
        assert_eq!(first, content_hash(&record).unwrap());
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_content_hash_changes_with_content() {
        let a = Record {
            id: "ws_1".into(),
            value: 42,
        };
        let b = Record {
            id: "ws_1".into(),
            value: 43,
        };
        assert_ne!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
    }
}
