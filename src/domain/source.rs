use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of backend variants a source adapter can translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ForumRest,
    Rss,
    JsonFeed,
    Html,
    Discourse,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::ForumRest => "forum_rest",
            SourceKind::Rss => "rss",
            SourceKind::JsonFeed => "json_feed",
            SourceKind::Html => "html",
            SourceKind::Discourse => "discourse",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "forum_rest" => Some(SourceKind::ForumRest),
            "rss" => Some(SourceKind::Rss),
            "json_feed" => Some(SourceKind::JsonFeed),
            "html" => Some(SourceKind::Html),
            "discourse" => Some(SourceKind::Discourse),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured content source, persisted so streams survive restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub kind: SourceKind,
    pub base_url: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SourceRecord {
    pub fn new(id: &str, kind: SourceKind, base_url: &str) -> Self {
        Self {
            id: id.to_string(),
            kind,
            base_url: base_url.to_string(),
            title: None,
            created_at: Utc::now(),
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            SourceKind::ForumRest,
            SourceKind::Rss,
            SourceKind::JsonFeed,
            SourceKind::Html,
            SourceKind::Discourse,
        ] {
            assert_eq!(SourceKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_kind_parse_unknown() {
        assert_eq!(SourceKind::parse("gopher"), None);
    }
}
