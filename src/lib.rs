//! # Estuary
//!
//! A paginated sync and cache engine for heterogeneous content sources.
//!
//! ## Architecture
//!
//! Estuary follows a mediator architecture:
//!
//! ```text
//! SourceAdapter → PagedSyncMediator → CacheStore → readers
//! ```
//!
//! Remote backends (forum REST APIs, RSS/Atom feeds, JSON Feeds, plain
//! HTML pages, Discourse instances) are wrapped in adapters that
//! normalize their pages into shared domain models. The mediator decides
//! when a page must be fetched, commits it to the store in one
//! transaction, and tracks per-stream pagination boundaries so later
//! loads resume where the last one stopped.
//!
//! ## Quick Start
//!
//! ```bash
//! # Register a source
//! estuary sources add blog rss https://blog.rust-lang.org/feed.xml
//!
//! # Bring every source up to date
//! estuary sync
//!
//! # Page through a cached topic stream
//! estuary topics blog blog --limit 20
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`cli`]: Command-line interface definitions
//! - [`domain`]: Core domain models (Topic, Comment, TrendItem, Forum)
//! - [`paging`]: Streams, cursors, staleness policy and the sync mediator
//! - [`source`]: Source adapters and the shared HTTP client
//! - [`store`]: Database persistence
//! - [`sync`]: Concurrent multi-stream sync runner

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all
/// components: store, adapter registry, mediator, sync runner.
pub mod app;

/// Command-line interface using clap.
///
/// Defines the CLI structure and subcommands:
/// - `sources add|list|remove` - Manage registered sources
/// - `sync [--source] [--force]` - Sync configured streams
/// - `topics`, `comments`, `trends`, `forums` - Load and show content
/// - `clear <kind> <stream>` - Drop one stream's cache and keys
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/estuary/config.toml`, supporting per-category
/// freshness windows, feed date strictness and sync concurrency.
pub mod config;

/// Core domain models.
///
/// - [`Topic`](domain::Topic): A thread or feed entry with a SHA256 ID
/// - [`Comment`](domain::Comment): A reply within a thread
/// - [`TrendItem`](domain::TrendItem): A ranked trending entry
/// - [`Forum`](domain::Forum): A board exposed by a source
pub mod domain;

/// Streams, cursors and the sync mediator.
///
/// - [`Stream`](paging::Stream): One paginated sequence of items
/// - [`TopicKey`](paging::TopicKey)/[`CommentKey`](paging::CommentKey):
///   orderable item cursors with a stable string form
/// - [`StalenessPolicy`](paging::StalenessPolicy): TTL freshness checks
/// - [`PagedSyncMediator`](paging::PagedSyncMediator): the load engine
pub mod paging;

/// Source adapters and the shared HTTP client.
///
/// - [`SourceAdapter`](source::SourceAdapter): Async trait every backend
///   implements
/// - [`HttpClient`](source::HttpClient): reqwest-based client shared by
///   all adapters
pub mod source;

/// SQLite persistence layer.
///
/// - [`CacheStore`](store::CacheStore): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

/// Concurrent multi-stream sync.
///
/// - [`SyncRunner`](sync::SyncRunner): Semaphore-bounded runner
/// - [`SyncPlan`](sync::SyncPlan): One stream to bring up to date
pub mod sync;
