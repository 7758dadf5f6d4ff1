pub mod sqlite;

use tokio::sync::broadcast;

use crate::app::Result;
use crate::domain::{Comment, SourceRecord, Topic, TrendItem};
use crate::paging::{RemoteKey, Stream};

pub use sqlite::SqliteStore;

/// Published after every committed write so reactive readers can re-query
/// the streams they care about.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub stream: Stream,
}

/// Read/write facade over the persistent cache.
///
/// All access goes through typed operations; no raw storage handle ever
/// escapes, which is what keeps the storage engine substitutable. Batch
/// writes are transactional: all items plus the remote-key update commit
/// together or not at all.
pub trait CacheStore: Send + Sync {
    // Source bookkeeping
    fn add_source(&self, source: &SourceRecord) -> Result<()>;
    fn get_source(&self, id: &str) -> Result<Option<SourceRecord>>;
    fn get_all_sources(&self) -> Result<Vec<SourceRecord>>;
    fn remove_source(&self, id: &str) -> Result<()>;

    // Topic operations
    fn save_topics(&self, stream: &Stream, items: &[Topic]) -> Result<usize>;
    fn get_topic(&self, source_id: &str, native_id: &str) -> Result<Option<Topic>>;
    fn topics_page(&self, stream: &Stream, offset: i64, limit: i64) -> Result<Vec<Topic>>;
    fn commit_topic_page(
        &self,
        stream: &Stream,
        items: &[Topic],
        key: &RemoteKey,
        replace: bool,
    ) -> Result<()>;

    // Comment operations
    fn save_comments(&self, stream: &Stream, items: &[Comment]) -> Result<usize>;
    fn get_comment(&self, source_id: &str, native_id: &str) -> Result<Option<Comment>>;
    fn comments_page(&self, stream: &Stream, offset: i64, limit: i64) -> Result<Vec<Comment>>;
    fn commit_comment_page(
        &self,
        stream: &Stream,
        items: &[Comment],
        key: &RemoteKey,
        replace: bool,
    ) -> Result<()>;

    // Trend operations
    fn save_trends(&self, stream: &Stream, items: &[TrendItem]) -> Result<usize>;
    fn trends_page(&self, stream: &Stream, offset: i64, limit: i64) -> Result<Vec<TrendItem>>;
    fn commit_trend_page(
        &self,
        stream: &Stream,
        items: &[TrendItem],
        key: &RemoteKey,
        replace: bool,
    ) -> Result<()>;

    // Stream-scoped queries
    fn count_rows(&self, stream: &Stream) -> Result<i64>;
    fn clear_stream(&self, stream: &Stream) -> Result<()>;

    // Remote key store
    fn remote_key(&self, stream: &Stream) -> Result<Option<RemoteKey>>;
    fn upsert_remote_key(&self, key: &RemoteKey) -> Result<()>;
    fn touch_remote_key(&self, stream: &Stream, now: i64) -> Result<()>;

    // Reactive reads: subscribe, then re-query on events for your stream.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
