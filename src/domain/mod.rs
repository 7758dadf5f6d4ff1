pub mod comment;
pub mod forum;
pub mod source;
pub mod topic;
pub mod trend;

pub use comment::Comment;
pub use forum::{Forum, ThreadDetail};
pub use source::{SourceKind, SourceRecord};
pub use topic::Topic;
pub use trend::TrendItem;

use sha2::{Digest, Sha256};

/// Generate a deterministic row ID from a source ID and a native entity ID.
///
/// Record identity is source-scoped: the same native ID on two different
/// sources must never collide.
pub fn record_id(source_id: &str, native_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(native_id.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_deterministic() {
        let id1 = record_id("nmb", "12345");
        let id2 = record_id("nmb", "12345");
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_record_id_source_scoped() {
        let id1 = record_id("nmb", "12345");
        let id2 = record_id("discourse", "12345");
        let id3 = record_id("nmb", "12346");
        assert_ne!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_record_id_is_hex_sha256() {
        let id = record_id("nmb", "12345");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
