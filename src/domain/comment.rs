use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::record_id;
use crate::paging::CommentKey;

/// A normalized reply within a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub source_id: String,
    pub native_id: String,
    /// Native ID of the thread this reply belongs to.
    pub topic_native_id: String,
    /// Native ID of the parent reply, for sources that support sub-comments.
    pub parent_native_id: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
    /// Position within the thread, 1-based; drives reply ordering.
    pub floor: i64,
    /// Posting time in epoch millis.
    pub created_at: i64,
    pub like_count: i64,
    pub fetched_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(source_id: &str, native_id: &str, topic_native_id: &str, floor: i64) -> Self {
        Self {
            id: record_id(source_id, native_id),
            source_id: source_id.to_string(),
            native_id: native_id.to_string(),
            topic_native_id: topic_native_id.to_string(),
            parent_native_id: None,
            author: None,
            content: None,
            floor,
            created_at: 0,
            like_count: 0,
            fetched_at: Utc::now(),
        }
    }

    /// Pagination cursor for this reply.
    pub fn key(&self) -> CommentKey {
        CommentKey {
            floor: self.floor,
            id: self.native_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_independent_of_topic() {
        let a = Comment::new("nmb", "r1", "t1", 1);
        let b = Comment::new("nmb", "r1", "t2", 1);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_key() {
        let c = Comment::new("nmb", "r9", "t1", 9);
        let key = c.key();
        assert_eq!(key.floor, 9);
        assert_eq!(key.id, "r9");
    }
}
