use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::record_id;
use crate::paging::TopicKey;

/// A normalized discussion thread or article entry.
///
/// Carries enough denormalized fields that a cached list can be rendered
/// without another round-trip to the source adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub source_id: String,
    pub native_id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
    pub link: Option<String>,
    /// Last-bumped time in epoch millis; drives topic list ordering.
    pub receive_date: i64,
    pub reply_count: i64,
    pub fetched_at: DateTime<Utc>,
}

impl Topic {
    pub fn new(source_id: &str, native_id: &str, receive_date: i64) -> Self {
        Self {
            id: record_id(source_id, native_id),
            source_id: source_id.to_string(),
            native_id: native_id.to_string(),
            title: None,
            author: None,
            content: None,
            link: None,
            receive_date,
            reply_count: 0,
            fetched_at: Utc::now(),
        }
    }

    /// Pagination cursor for this topic.
    pub fn key(&self) -> TopicKey {
        TopicKey {
            receive_date: self.receive_date,
            topic_id: self.native_id.clone(),
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_source_scoped() {
        let a = Topic::new("nmb", "100", 0);
        let b = Topic::new("acfun", "100", 0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_key_reflects_fields() {
        let mut t = Topic::new("nmb", "100", 1700000000000);
        t.title = Some("hello".into());
        let key = t.key();
        assert_eq!(key.receive_date, 1700000000000);
        assert_eq!(key.topic_id, "100");
    }

    #[test]
    fn test_display_title_fallback() {
        let t = Topic::new("nmb", "100", 0);
        assert_eq!(t.display_title(), "(Untitled)");
    }
}
