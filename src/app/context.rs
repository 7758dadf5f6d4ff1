use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{EstuaryError, Result};
use crate::config::Config;
use crate::domain::{SourceKind, SourceRecord};
use crate::paging::PagedSyncMediator;
use crate::source::{
    AdapterRegistry, DiscourseAdapter, ForumRestAdapter, HtmlAdapter, HttpClient, JsonFeedAdapter,
    RssAdapter, SourceAdapter,
};
use crate::store::{CacheStore, SqliteStore};
use crate::sync::SyncRunner;

/// Wires the store, adapter registry, mediator and sync runner together
/// with plain constructor injection. The registry is rebuilt from the
/// persisted source table at startup; nothing is discovered at runtime.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub registry: Arc<AdapterRegistry>,
    pub mediator: Arc<PagedSyncMediator>,
    pub runner: SyncRunner,
}

impl AppContext {
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };
        Self::from_store(config, Arc::new(SqliteStore::new(&db_path)?))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        Self::from_store(config, Arc::new(SqliteStore::in_memory()?))
    }

    fn from_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let client = HttpClient::new();
        let mut registry = AdapterRegistry::new();
        for source in store.get_all_sources()? {
            registry.register(build_adapter(&source, &client, &config));
        }
        let registry = Arc::new(registry);

        let mediator = Arc::new(PagedSyncMediator::new(store.clone()));
        let runner = SyncRunner::with_workers(
            mediator.clone(),
            registry.clone(),
            config.sync.workers,
        );

        Ok(Self {
            config,
            store,
            registry,
            mediator,
            runner,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| EstuaryError::Config("Could not find data directory".into()))?;
        let estuary_dir = data_dir.join("estuary");
        std::fs::create_dir_all(&estuary_dir)?;
        Ok(estuary_dir.join("estuary.db"))
    }
}

fn build_adapter(
    source: &SourceRecord,
    client: &HttpClient,
    config: &Config,
) -> Arc<dyn SourceAdapter> {
    let strict = config.feeds.strict_dates;
    match source.kind {
        SourceKind::ForumRest => Arc::new(ForumRestAdapter::new(
            &source.id,
            &source.base_url,
            client.clone(),
        )),
        SourceKind::Discourse => Arc::new(DiscourseAdapter::new(
            &source.id,
            &source.base_url,
            client.clone(),
        )),
        SourceKind::Rss => Arc::new(
            RssAdapter::new(&source.id, &source.base_url, client.clone())
                .with_strict_dates(strict),
        ),
        SourceKind::JsonFeed => Arc::new(
            JsonFeedAdapter::new(&source.id, &source.base_url, client.clone())
                .with_strict_dates(strict),
        ),
        SourceKind::Html => Arc::new(
            HtmlAdapter::new(&source.id, &source.base_url, client.clone())
                .with_strict_dates(strict),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_built_from_persisted_sources() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        store
            .add_source(&SourceRecord::new(
                "nmb",
                SourceKind::ForumRest,
                "https://api.example.com",
            ))
            .unwrap();
        store
            .add_source(&SourceRecord::new(
                "blog",
                SourceKind::Rss,
                "https://example.com/feed.xml",
            ))
            .unwrap();

        let ctx = AppContext::from_store(Config::default(), store).unwrap();
        assert!(ctx.registry.get("nmb").is_some());
        assert!(ctx.registry.get("blog").is_some());
        assert!(ctx.registry.get("missing").is_none());
        assert_eq!(ctx.registry.source_ids(), vec!["blog", "nmb"]);
    }
}
