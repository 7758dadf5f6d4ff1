use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Duration;
use tokio::sync::Mutex as AsyncMutex;

use crate::app::Result;
use crate::paging::{
    LoadDirection, Page, RemoteKey, StalenessPolicy, Stream,
};
use crate::source::{FetchError, SourceAdapter};
use crate::store::CacheStore;

/// When the cache may substitute for the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPolicy {
    /// Serve from cache if any rows exist; fetch only when empty.
    CacheFirst,
    /// Always fetch on refresh; cache is a write-through mirror.
    ApiFirst,
    /// Never consult the cache; always fetch.
    NetworkOnly,
    /// Fetch only when the cache is empty; on a network failure fall back
    /// to whatever is cached, suppressing the error.
    CacheElseNetwork,
}

/// How to resolve the effective page key for prepend/append when the
/// remote-key row has no marker recorded in that direction.
///
/// Some backends must anchor key-pagination off the currently visible
/// item rather than the stream head, hence the per-stream choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Use the stored prev/next markers as-is; a missing marker means the
    /// stream is exhausted in that direction.
    ClosestToWindow,
    /// A missing prev marker is derived from the first loaded page anchor
    /// (`curr_key - 1`).
    FirstItem,
    /// A missing next marker is derived from the last loaded page anchor
    /// (`curr_key + 1`).
    LastItem,
}

/// Caller-supplied predicate deriving end-of-pagination from a returned
/// page; some adapters only learn the end from a trailing empty fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndPredicate {
    /// The stream ends when a page comes back empty.
    EmptyPage,
    /// The stream ends when a page holds fewer than this many items.
    FewerThan(usize),
}

impl EndPredicate {
    fn reached<T>(&self, page: &Page<T>) -> bool {
        match self {
            EndPredicate::EmptyPage => page.items.is_empty(),
            EndPredicate::FewerThan(n) => page.items.len() < *n,
        }
    }
}

/// One load call against a stream.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub stream: Stream,
    pub direction: LoadDirection,
    pub policy: DataPolicy,
    pub strategy: KeyStrategy,
    /// When set, an elapsed TTL forces a refetch even under cache-serving
    /// policies; when `None` only cache emptiness decides.
    pub ttl: Option<Duration>,
    /// Page key used for a refresh; page-numbered backends start at 1.
    pub initial_key: i64,
    pub end_predicate: EndPredicate,
}

impl LoadRequest {
    pub fn new(stream: Stream, direction: LoadDirection) -> Self {
        Self {
            stream,
            direction,
            policy: DataPolicy::CacheElseNetwork,
            strategy: KeyStrategy::ClosestToWindow,
            ttl: None,
            initial_key: 1,
            end_predicate: EndPredicate::EmptyPage,
        }
    }

    pub fn policy(mut self, policy: DataPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn strategy(mut self, strategy: KeyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn end_predicate(mut self, predicate: EndPredicate) -> Self {
        self.end_predicate = predicate;
        self
    }
}

/// What a load call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Whether the adapter was called.
    pub fetched: bool,
    /// Whether the result was served from the local cache.
    pub from_cache: bool,
    /// Items in the committed page (0 when served from cache).
    pub new_items: usize,
    pub end_reached: bool,
}

impl LoadOutcome {
    fn cached() -> Self {
        Self {
            fetched: false,
            from_cache: true,
            new_items: 0,
            end_reached: false,
        }
    }

    fn exhausted() -> Self {
        Self {
            fetched: false,
            from_cache: true,
            new_items: 0,
            end_reached: true,
        }
    }
}

/// Orchestrates page loads: decides cache vs network, fetches through a
/// source adapter, commits results and the updated remote key in one
/// storage transaction, and reports end-of-stream.
///
/// Loads against the same stream are serialized by a per-stream guard;
/// loads against different streams proceed concurrently. A cancelled fetch
/// never reaches the transactional-write step, so a crash mid-fetch leaves
/// the cache stale but never partially written.
pub struct PagedSyncMediator {
    store: Arc<dyn CacheStore>,
    staleness: StalenessPolicy,
    guards: StdMutex<HashMap<Stream, Arc<AsyncMutex<()>>>>,
}

impl PagedSyncMediator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        let staleness = StalenessPolicy::new(store.clone());
        Self {
            store,
            staleness,
            guards: StdMutex::new(HashMap::new()),
        }
    }

    pub fn staleness(&self) -> &StalenessPolicy {
        &self.staleness
    }

    pub async fn load_topics(
        &self,
        adapter: &dyn SourceAdapter,
        req: &LoadRequest,
    ) -> Result<LoadOutcome> {
        let guard = self.guard(&req.stream);
        let _held = guard.lock().await;

        if !self.wants_network(req)? {
            return Ok(LoadOutcome::cached());
        }
        let Some(key) = self.resolve_key(req)? else {
            return Ok(LoadOutcome::exhausted());
        };

        tracing::debug!(stream = %req.stream, ?req.direction, key, "fetching topics");
        match adapter.fetch_topics(&req.stream, req.direction, key).await {
            Ok(page) => {
                let remote = self.boundary_update(req, key, &page);
                self.store.commit_topic_page(
                    &req.stream,
                    &page.items,
                    &remote,
                    req.direction == LoadDirection::Refresh,
                )?;
                Ok(Self::outcome(req, &page))
            }
            Err(e) => self.fallback_or_err(req, e),
        }
    }

    pub async fn load_comments(
        &self,
        adapter: &dyn SourceAdapter,
        req: &LoadRequest,
    ) -> Result<LoadOutcome> {
        let guard = self.guard(&req.stream);
        let _held = guard.lock().await;

        if !self.wants_network(req)? {
            return Ok(LoadOutcome::cached());
        }
        let Some(key) = self.resolve_key(req)? else {
            return Ok(LoadOutcome::exhausted());
        };

        tracing::debug!(stream = %req.stream, ?req.direction, key, "fetching comments");
        match adapter
            .fetch_comments(&req.stream, req.direction, key)
            .await
        {
            Ok(page) => {
                let remote = self.boundary_update(req, key, &page);
                self.store.commit_comment_page(
                    &req.stream,
                    &page.items,
                    &remote,
                    req.direction == LoadDirection::Refresh,
                )?;
                Ok(Self::outcome(req, &page))
            }
            Err(e) => self.fallback_or_err(req, e),
        }
    }

    pub async fn load_trends(
        &self,
        adapter: &dyn SourceAdapter,
        req: &LoadRequest,
    ) -> Result<LoadOutcome> {
        let guard = self.guard(&req.stream);
        let _held = guard.lock().await;

        if !self.wants_network(req)? {
            return Ok(LoadOutcome::cached());
        }
        let Some(key) = self.resolve_key(req)? else {
            return Ok(LoadOutcome::exhausted());
        };

        tracing::debug!(stream = %req.stream, ?req.direction, key, "fetching trends");
        match adapter.fetch_trends(&req.stream, req.direction, key).await {
            Ok(page) => {
                let remote = self.boundary_update(req, key, &page);
                self.store.commit_trend_page(
                    &req.stream,
                    &page.items,
                    &remote,
                    req.direction == LoadDirection::Refresh,
                )?;
                Ok(Self::outcome(req, &page))
            }
            Err(e) => self.fallback_or_err(req, e),
        }
    }

    /// Per-stream single-flight guard. Entries are created lazily and kept
    /// for the process lifetime; the set of live streams is small.
    fn guard(&self, stream: &Stream) -> Arc<AsyncMutex<()>> {
        let mut guards = self.guards.lock().expect("guard map poisoned");
        guards
            .entry(stream.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn wants_network(&self, req: &LoadRequest) -> Result<bool> {
        // Prepend/append always need the remote page; cache short-circuits
        // apply to refresh only.
        if req.direction != LoadDirection::Refresh {
            return Ok(true);
        }
        match req.policy {
            DataPolicy::NetworkOnly | DataPolicy::ApiFirst => Ok(true),
            DataPolicy::CacheFirst | DataPolicy::CacheElseNetwork => {
                if self.store.count_rows(&req.stream)? == 0 {
                    return Ok(true);
                }
                match req.ttl {
                    Some(ttl) => self.staleness.should_fetch(&req.stream, ttl),
                    None => Ok(false),
                }
            }
        }
    }

    /// Resolve the effective page key, or `None` when the stream is
    /// exhausted in the requested direction.
    fn resolve_key(&self, req: &LoadRequest) -> Result<Option<i64>> {
        if req.direction == LoadDirection::Refresh {
            return Ok(Some(req.initial_key));
        }

        // No recorded window yet means nothing to extend; the consumer
        // must refresh first.
        let Some(remote) = self.store.remote_key(&req.stream)? else {
            return Ok(None);
        };

        let stored = match req.direction {
            LoadDirection::Prepend => remote.prev_key,
            LoadDirection::Append => remote.next_key,
            LoadDirection::Refresh => unreachable!(),
        };
        if stored.is_some() {
            return Ok(stored);
        }

        let derived = match (req.strategy, req.direction) {
            (KeyStrategy::FirstItem, LoadDirection::Prepend)
                if remote.curr_key > req.initial_key =>
            {
                Some(remote.curr_key - 1)
            }
            (KeyStrategy::LastItem, LoadDirection::Append) => Some(remote.curr_key + 1),
            _ => None,
        };
        Ok(derived)
    }

    fn boundary_update<T>(&self, req: &LoadRequest, key: i64, page: &Page<T>) -> RemoteKey {
        RemoteKey::new(req.stream.clone(), page.prev_key, key, page.next_key)
    }

    fn outcome<T>(req: &LoadRequest, page: &Page<T>) -> LoadOutcome {
        LoadOutcome {
            fetched: true,
            from_cache: false,
            new_items: page.items.len(),
            end_reached: page.end_reached || req.end_predicate.reached(page),
        }
    }

    fn fallback_or_err(&self, req: &LoadRequest, err: FetchError) -> Result<LoadOutcome> {
        if req.policy == DataPolicy::CacheElseNetwork
            && matches!(err, FetchError::NetworkUnavailable(_))
        {
            tracing::warn!(stream = %req.stream, error = %err, "fetch failed, serving cache");
            return Ok(LoadOutcome::cached());
        }
        Err(err.into())
    }
}
