use chrono::{Duration, TimeZone, Utc};

use crate::app::{AppContext, EstuaryError, Result};
use crate::domain::{SourceKind, SourceRecord};
use crate::paging::{DataPolicy, LoadDirection, LoadRequest, Stream, StreamKind};
use crate::source::SourceAdapter;
use crate::store::CacheStore;
use crate::sync::SyncPlan;

pub fn add_source(ctx: &AppContext, id: &str, kind: &str, base_url: &str) -> Result<()> {
    let kind = SourceKind::parse(kind).ok_or_else(|| {
        EstuaryError::Config(format!(
            "unknown source kind {kind:?} (expected forum_rest, rss, json_feed, html or discourse)"
        ))
    })?;

    if ctx.store.get_source(id)?.is_some() {
        println!("Source already exists: {}", id);
        return Ok(());
    }

    url::Url::parse(base_url)?;
    ctx.store
        .add_source(&SourceRecord::new(id, kind, base_url))?;
    println!("Added {} source: {} ({})", kind, id, base_url);
    Ok(())
}

pub fn list_sources(ctx: &AppContext) -> Result<()> {
    let sources = ctx.store.get_all_sources()?;
    if sources.is_empty() {
        println!("No sources");
        return Ok(());
    }
    for source in sources {
        println!("{:<16} {:<12} {}", source.id, source.kind, source.base_url);
    }
    Ok(())
}

pub fn remove_source(ctx: &AppContext, id: &str) -> Result<()> {
    ctx.store
        .get_source(id)?
        .ok_or_else(|| EstuaryError::SourceNotFound(id.to_string()))?;
    ctx.store.remove_source(id)?;
    println!("Removed source: {}", id);
    Ok(())
}

/// Sync the primary stream of every registered source: the trend tab for
/// forum-like sources, the topic list for document sources.
pub async fn sync(ctx: &AppContext, only: Option<&str>, force: bool) -> Result<()> {
    let policy = if force {
        DataPolicy::NetworkOnly
    } else {
        ctx.config.data_policy()?
    };

    let mut plans = Vec::new();
    for source in ctx.store.get_all_sources()? {
        if only.is_some_and(|id| id != source.id) {
            continue;
        }
        let (stream, ttl) = match source.kind {
            SourceKind::ForumRest | SourceKind::Discourse => (
                Stream::trend(format!("{}_hot", source.id)),
                ctx.config.ttl.trend,
            ),
            SourceKind::Rss | SourceKind::JsonFeed | SourceKind::Html => (
                Stream::topics(source.id.clone()),
                ctx.config.ttl.topics,
            ),
        };

        let mut plan = SyncPlan::refresh(&source.id, stream);
        plan.request = plan.request.policy(policy);
        if !force {
            plan.request = plan.request.ttl(Duration::seconds(ttl as i64));
        }
        plans.push(plan);
    }

    if plans.is_empty() {
        println!("Nothing to sync");
        return Ok(());
    }

    println!("Syncing {} streams...", plans.len());
    let results = ctx.runner.run_all(plans).await;

    let mut errors = 0;
    for (stream, result) in results {
        match result {
            Ok(outcome) if outcome.fetched => {
                println!("  {}: {} items", stream, outcome.new_items);
            }
            Ok(_) => {
                println!("  {}: fresh, served from cache", stream);
            }
            Err(e) => {
                errors += 1;
                eprintln!("  {}: {}", stream, e);
            }
        }
    }
    if errors > 0 {
        println!("Sync finished with {} errors", errors);
    } else {
        println!("Sync complete");
    }
    Ok(())
}

pub async fn show_topics(
    ctx: &AppContext,
    source_id: &str,
    stream_id: &str,
    offset: i64,
    limit: i64,
) -> Result<()> {
    let adapter = require_adapter(ctx, source_id)?;
    let stream = Stream::topics(stream_id);

    let req = LoadRequest::new(stream.clone(), LoadDirection::Refresh)
        .policy(ctx.config.data_policy()?)
        .ttl(Duration::seconds(ctx.config.ttl.topics as i64));
    ctx.mediator.load_topics(adapter.as_ref(), &req).await?;

    let topics = ctx.store.topics_page(&stream, offset, limit)?;
    if topics.is_empty() {
        println!("No topics cached for {}", stream);
        return Ok(());
    }
    for topic in &topics {
        println!(
            "{:<12} {:<20} {}  ({} replies)",
            topic.native_id,
            format_millis(topic.receive_date),
            topic.display_title(),
            topic.reply_count
        );
    }
    if let Some(cursor) = topics_resume_cursor(&topics) {
        println!("Resume cursor: {}", cursor);
    }
    Ok(())
}

pub async fn show_comments(
    ctx: &AppContext,
    source_id: &str,
    topic_id: &str,
    more: bool,
) -> Result<()> {
    let adapter = require_adapter(ctx, source_id)?;
    let stream = Stream::comments(topic_id);

    let direction = if more {
        LoadDirection::Append
    } else {
        LoadDirection::Refresh
    };
    let req = LoadRequest::new(stream.clone(), direction)
        .policy(ctx.config.data_policy()?)
        .ttl(Duration::seconds(ctx.config.ttl.comments as i64));
    let outcome = ctx.mediator.load_comments(adapter.as_ref(), &req).await?;

    let comments = ctx.store.comments_page(&stream, 0, 200)?;
    for comment in &comments {
        println!(
            "#{:<5} {:<16} {}",
            comment.floor,
            comment.author.as_deref().unwrap_or("-"),
            comment.content.as_deref().unwrap_or("")
        );
    }
    if let Some(cursor) = comments_resume_cursor(&comments) {
        println!("Resume cursor: {}", cursor);
    }
    if outcome.end_reached {
        println!("(end of thread)");
    }
    Ok(())
}

/// Cursor of the last listed topic, in the stable `"date:id"` string form
/// a consumer hands back to resume the window.
fn topics_resume_cursor(topics: &[crate::domain::Topic]) -> Option<String> {
    topics.last().map(|t| t.key().encode())
}

fn comments_resume_cursor(comments: &[crate::domain::Comment]) -> Option<String> {
    comments.last().map(|c| c.key().encode())
}

pub async fn show_trends(ctx: &AppContext, source_id: &str, tab: &str) -> Result<()> {
    let adapter = require_adapter(ctx, source_id)?;
    let stream = Stream::trend(format!("{source_id}_{tab}"));

    let req = LoadRequest::new(stream.clone(), LoadDirection::Refresh)
        .policy(ctx.config.data_policy()?)
        .ttl(Duration::seconds(ctx.config.ttl.trend as i64));
    ctx.mediator.load_trends(adapter.as_ref(), &req).await?;

    let items = ctx.store.trends_page(&stream, 0, 50)?;
    if items.is_empty() {
        println!("No trend items cached for {}", stream);
        return Ok(());
    }
    for item in items {
        println!(
            "{:>3}. {}  (heat {})",
            item.rank,
            item.title.as_deref().unwrap_or("(untitled)"),
            item.heat
        );
    }
    Ok(())
}

pub async fn show_forums(ctx: &AppContext, source_id: &str) -> Result<()> {
    let adapter = require_adapter(ctx, source_id)?;
    let forums = adapter.get_forums().await.map_err(EstuaryError::from)?;

    let mut current_group: Option<String> = None;
    for forum in forums {
        if forum.group != current_group {
            if let Some(name) = &forum.group {
                println!("[{}]", name);
            }
            current_group = forum.group.clone();
        }
        println!("  {:<8} {}", forum.native_id, forum.name);
    }
    Ok(())
}

pub fn clear(ctx: &AppContext, kind: &str, stream_id: &str) -> Result<()> {
    let kind = StreamKind::parse(kind).ok_or_else(|| {
        EstuaryError::Config(format!(
            "unknown stream kind {kind:?} (expected topics, comments or trend)"
        ))
    })?;
    let stream = Stream::new(kind, stream_id);
    ctx.store.clear_stream(&stream)?;
    println!("Cleared {}", stream);
    Ok(())
}

fn require_adapter(
    ctx: &AppContext,
    source_id: &str,
) -> Result<std::sync::Arc<dyn SourceAdapter>> {
    ctx.registry
        .get(source_id)
        .ok_or_else(|| EstuaryError::SourceNotFound(source_id.to_string()))
}

fn format_millis(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Comment, Topic};
    use crate::paging::{CommentKey, TopicKey};

    #[test]
    fn test_topics_resume_cursor_round_trips() {
        let topics = vec![
            Topic::new("nmb", "100", 2000),
            Topic::new("nmb", "101", 1000),
        ];
        let cursor = topics_resume_cursor(&topics).unwrap();
        assert_eq!(cursor, "1000:101");
        assert_eq!(
            TopicKey::decode(&cursor).unwrap(),
            topics.last().unwrap().key()
        );
    }

    #[test]
    fn test_comments_resume_cursor_round_trips() {
        let comments = vec![Comment::new("nmb", "r1", "t1", 1)];
        let cursor = comments_resume_cursor(&comments).unwrap();
        assert_eq!(CommentKey::decode(&cursor).unwrap(), comments[0].key());
    }

    #[test]
    fn test_resume_cursor_empty_page() {
        assert!(topics_resume_cursor(&[]).is_none());
        assert!(comments_resume_cursor(&[]).is_none());
    }
}
