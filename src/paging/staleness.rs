use std::sync::Arc;

use chrono::Duration;

use crate::app::Result;
use crate::paging::{now_millis, Stream};
use crate::store::CacheStore;

/// Decides whether a stream's cached window is fresh enough to skip a
/// remote refetch.
///
/// Freshness rides on the remote-key row's `last_updated` timestamp. A
/// freshness ping (`mark_fetched`) and a page-boundary update are different
/// events: the ping moves only the timestamp.
#[derive(Clone)]
pub struct StalenessPolicy {
    store: Arc<dyn CacheStore>,
}

impl StalenessPolicy {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// True iff no remote key exists for the stream or the TTL has elapsed.
    pub fn should_fetch(&self, stream: &Stream, ttl: Duration) -> Result<bool> {
        match self.store.remote_key(stream)? {
            None => Ok(true),
            Some(key) => Ok(now_millis() - key.last_updated >= ttl.num_milliseconds()),
        }
    }

    /// Record that the stream was just fetched, leaving page boundaries as
    /// they are.
    pub fn mark_fetched(&self, stream: &Stream) -> Result<()> {
        self.store.touch_remote_key(stream, now_millis())
    }
}
