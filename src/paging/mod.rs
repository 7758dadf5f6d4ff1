pub mod cursor;
pub mod mediator;
pub mod staleness;

pub use cursor::{CommentKey, TopicKey};
pub use mediator::{
    DataPolicy, EndPredicate, KeyStrategy, LoadOutcome, LoadRequest, PagedSyncMediator,
};
pub use staleness::StalenessPolicy;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// What kind of paginated sequence a stream is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Topics,
    Comments,
    Trend,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Topics => "topics",
            StreamKind::Comments => "comments",
            StreamKind::Trend => "trend",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "topics" => Some(StreamKind::Topics),
            "comments" => Some(StreamKind::Comments),
            "trend" => Some(StreamKind::Trend),
            _ => None,
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One paginated sequence of items, e.g. a forum's topic list, a thread's
/// reply list, or a trend tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stream {
    pub kind: StreamKind,
    pub id: String,
}

impl Stream {
    pub fn new(kind: StreamKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn topics(id: impl Into<String>) -> Self {
        Self::new(StreamKind::Topics, id)
    }

    pub fn comments(id: impl Into<String>) -> Self {
        Self::new(StreamKind::Comments, id)
    }

    pub fn trend(id: impl Into<String>) -> Self {
        Self::new(StreamKind::Trend, id)
    }
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Direction of a load call against a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadDirection {
    /// Reload from the head of the stream.
    Refresh,
    /// The page before the current window.
    Prepend,
    /// The page after the current window.
    Append,
}

/// One fetched page, normalized to the shared shape by a source adapter.
///
/// `prev_key`/`next_key` are the adapter's page markers for the neighbouring
/// pages; `None` means the adapter knows there is nothing in that direction.
/// `end_reached` is advisory; the mediator combines it with its own predicate
/// since some backends only learn the end from a trailing empty fetch.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub prev_key: Option<i64>,
    pub next_key: Option<i64>,
    pub end_reached: bool,
}

impl<T> Page<T> {
    /// A single-shot page for sources without native pagination.
    pub fn single(items: Vec<T>) -> Self {
        Self {
            items,
            prev_key: None,
            next_key: None,
            end_reached: true,
        }
    }
}

/// Persisted record of a stream's last-known page boundaries.
///
/// One row per stream; overwritten on every successful page commit, touched
/// (timestamp only) on freshness pings, deleted only by an explicit
/// stream clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteKey {
    pub stream: Stream,
    pub prev_key: Option<i64>,
    pub curr_key: i64,
    pub next_key: Option<i64>,
    /// Epoch millis of the last successful fetch for this stream.
    pub last_updated: i64,
}

impl RemoteKey {
    pub fn new(stream: Stream, prev_key: Option<i64>, curr_key: i64, next_key: Option<i64>) -> Self {
        Self {
            stream,
            prev_key,
            curr_key,
            next_key,
            last_updated: now_millis(),
        }
    }
}

/// Current time in epoch millis, the unit used by remote keys and cursors.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_display() {
        let s = Stream::trend("nmb_hot");
        assert_eq!(s.to_string(), "trend/nmb_hot");
    }

    #[test]
    fn test_stream_kind_round_trip() {
        for kind in [StreamKind::Topics, StreamKind::Comments, StreamKind::Trend] {
            assert_eq!(StreamKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(StreamKind::parse("unknown"), None);
    }

    #[test]
    fn test_single_page_ends() {
        let page = Page::single(vec![1, 2, 3]);
        assert!(page.end_reached);
        assert_eq!(page.prev_key, None);
        assert_eq!(page.next_key, None);
    }
}
