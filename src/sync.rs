use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::app::Result;
use crate::paging::{
    LoadDirection, LoadOutcome, LoadRequest, PagedSyncMediator, Stream, StreamKind,
};
use crate::source::AdapterRegistry;

pub const DEFAULT_WORKERS: usize = 4;

/// One stream to bring up to date during a sync pass.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub source_id: String,
    pub request: LoadRequest,
}

impl SyncPlan {
    pub fn refresh(source_id: &str, stream: Stream) -> Self {
        Self {
            source_id: source_id.to_string(),
            request: LoadRequest::new(stream, LoadDirection::Refresh),
        }
    }
}

/// Runs many stream syncs concurrently, bounded by a worker pool.
pub struct SyncRunner {
    mediator: Arc<PagedSyncMediator>,
    registry: Arc<AdapterRegistry>,
    semaphore: Arc<Semaphore>,
}

impl SyncRunner {
    pub fn new(mediator: Arc<PagedSyncMediator>, registry: Arc<AdapterRegistry>) -> Self {
        Self::with_workers(mediator, registry, DEFAULT_WORKERS)
    }

    pub fn with_workers(
        mediator: Arc<PagedSyncMediator>,
        registry: Arc<AdapterRegistry>,
        workers: usize,
    ) -> Self {
        Self {
            mediator,
            registry,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Execute every plan, returning one result per stream in completion
    /// order.
    pub async fn run_all(&self, plans: Vec<SyncPlan>) -> Vec<(Stream, Result<LoadOutcome>)> {
        let mut handles = Vec::new();

        for plan in plans {
            let mediator = self.mediator.clone();
            let registry = self.registry.clone();
            let semaphore = self.semaphore.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");
                let stream = plan.request.stream.clone();
                let result = sync_one(&mediator, &registry, &plan).await;
                (stream, result)
            });
            handles.push(handle);
        }

        let mut results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                }
            }
        }
        results
    }
}

async fn sync_one(
    mediator: &PagedSyncMediator,
    registry: &AdapterRegistry,
    plan: &SyncPlan,
) -> Result<LoadOutcome> {
    let adapter = registry
        .get(&plan.source_id)
        .ok_or_else(|| crate::app::EstuaryError::SourceNotFound(plan.source_id.clone()))?;

    let outcome = match plan.request.stream.kind {
        StreamKind::Topics => mediator.load_topics(adapter.as_ref(), &plan.request).await?,
        StreamKind::Comments => {
            mediator
                .load_comments(adapter.as_ref(), &plan.request)
                .await?
        }
        StreamKind::Trend => mediator.load_trends(adapter.as_ref(), &plan.request).await?,
    };

    tracing::info!(
        stream = %plan.request.stream,
        fetched = outcome.fetched,
        items = outcome.new_items,
        end = outcome.end_reached,
        "stream synced"
    );
    Ok(outcome)
}
