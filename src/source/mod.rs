pub mod client;
pub mod discourse;
pub mod forum_rest;
pub mod html;
pub mod json_feed;
pub mod rss;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Comment, Forum, ThreadDetail, Topic, TrendItem};
use crate::paging::{LoadDirection, Page, Stream};

pub use client::HttpClient;
pub use discourse::DiscourseAdapter;
pub use forum_rest::ForumRestAdapter;
pub use html::HtmlAdapter;
pub use json_feed::JsonFeedAdapter;
pub use rss::RssAdapter;

/// Errors a source adapter can surface from a fetch.
///
/// Only `NetworkUnavailable` is eligible for cache-fallback under the
/// `CacheElseNetwork` policy; everything else propagates as a load error.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("remote rejected request with status {0}")]
    RemoteRejected(u16),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("operation not implemented by this source")]
    NotImplemented,
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// What a source adapter can do.
///
/// Flags are static for a given adapter instance and must not change
/// across calls; the mediator uses them to choose a fetch strategy and
/// presentation layers use them to degrade gracefully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceCapabilities {
    pub sub_comments: bool,
    pub voting: bool,
    pub po_filter: bool,
    pub page_jump: bool,
    pub polls: bool,
    pub hot_replies: bool,
    /// Paginates by offset rather than by page-number/cursor.
    pub offset_pagination: bool,
}

/// Per-backend translator from a remote API or document format into the
/// shared domain vocabulary.
///
/// Adapters own their backend's native pagination scheme and their own
/// network timeouts; timeouts surface as `NetworkUnavailable`. Sources
/// without native pagination (RSS, JSON Feed, HTML) return a single
/// full-document page with `end_reached = true`.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_id(&self) -> &str;

    fn capabilities(&self) -> SourceCapabilities;

    async fn fetch_topics(
        &self,
        stream: &Stream,
        direction: LoadDirection,
        key: i64,
    ) -> FetchResult<Page<Topic>>;

    async fn fetch_comments(
        &self,
        _stream: &Stream,
        _direction: LoadDirection,
        _key: i64,
    ) -> FetchResult<Page<Comment>> {
        Err(FetchError::NotImplemented)
    }

    async fn fetch_trends(
        &self,
        _stream: &Stream,
        _direction: LoadDirection,
        _key: i64,
    ) -> FetchResult<Page<TrendItem>> {
        Err(FetchError::NotImplemented)
    }

    /// Read-only board listing, outside the paging path.
    async fn get_forums(&self) -> FetchResult<Vec<Forum>> {
        Err(FetchError::NotImplemented)
    }

    /// Read-only thread metadata, outside the paging path.
    async fn get_thread_detail(&self, _native_id: &str) -> FetchResult<ThreadDetail> {
        Err(FetchError::NotImplemented)
    }
}

/// Static registry mapping a source ID to its adapter instance, built once
/// at startup. Lookup is explicit; nothing is located by reflection or
/// ambient wiring.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters
            .insert(adapter.source_id().to_string(), adapter);
    }

    pub fn get(&self, source_id: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(source_id).cloned()
    }

    pub fn source_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.adapters.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

/// Parse an RFC 3339 / RFC 2822 date into epoch millis.
///
/// Returns `None` on failure; callers decide between the lossy
/// substitute-now policy and rejecting the item (strict mode).
pub fn parse_date_millis(s: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc2822(s)
                .map(|dt| dt.timestamp_millis())
                .ok()
        })
}
