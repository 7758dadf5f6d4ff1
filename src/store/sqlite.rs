use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};
use tokio::sync::broadcast;

use crate::app::{EstuaryError, Result};
use crate::domain::{Comment, SourceKind, SourceRecord, Topic, TrendItem};
use crate::paging::{RemoteKey, Stream, StreamKind};
use crate::store::{CacheStore, StoreEvent};

const EVENT_CAPACITY: usize = 64;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    events: broadcast::Sender<StoreEvent>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let store = Self {
            conn: Mutex::new(conn),
            events,
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| EstuaryError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            EstuaryError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn publish(&self, stream: &Stream) {
        // No receivers is fine; the event is advisory.
        let _ = self.events.send(StoreEvent {
            stream: stream.clone(),
        });
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn topic_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Topic> {
        Ok(Topic {
            id: row.get(0)?,
            source_id: row.get(1)?,
            native_id: row.get(2)?,
            title: row.get(3)?,
            author: row.get(4)?,
            content: row.get(5)?,
            link: row.get(6)?,
            receive_date: row.get(7)?,
            reply_count: row.get(8)?,
            fetched_at: row
                .get::<_, String>(9)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    fn comment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
        Ok(Comment {
            id: row.get(0)?,
            source_id: row.get(1)?,
            native_id: row.get(2)?,
            topic_native_id: row.get(3)?,
            parent_native_id: row.get(4)?,
            author: row.get(5)?,
            content: row.get(6)?,
            floor: row.get(7)?,
            created_at: row.get(8)?,
            like_count: row.get(9)?,
            fetched_at: row
                .get::<_, String>(10)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    fn trend_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrendItem> {
        Ok(TrendItem {
            id: row.get(0)?,
            source_id: row.get(1)?,
            native_id: row.get(2)?,
            rank: row.get(3)?,
            title: row.get(4)?,
            summary: row.get(5)?,
            link: row.get(6)?,
            heat: row.get(7)?,
            fetched_at: row
                .get::<_, String>(8)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    fn remote_key_from_row(stream: &Stream, row: &rusqlite::Row<'_>) -> rusqlite::Result<RemoteKey> {
        Ok(RemoteKey {
            stream: stream.clone(),
            prev_key: row.get(0)?,
            curr_key: row.get(1)?,
            next_key: row.get(2)?,
            last_updated: row.get(3)?,
        })
    }

    fn upsert_topic_tx(tx: &rusqlite::Transaction<'_>, stream: &Stream, item: &Topic) -> Result<usize> {
        let n = tx.execute(
            "INSERT INTO topics (id, source_id, native_id, stream_kind, stream_id, title, author,
                                 content, link, receive_date, reply_count, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(source_id, native_id) DO UPDATE SET
                 stream_kind = excluded.stream_kind,
                 stream_id = excluded.stream_id,
                 title = excluded.title,
                 author = excluded.author,
                 content = excluded.content,
                 link = excluded.link,
                 receive_date = excluded.receive_date,
                 reply_count = excluded.reply_count,
                 fetched_at = excluded.fetched_at",
            params![
                item.id,
                item.source_id,
                item.native_id,
                stream.kind.as_str(),
                stream.id,
                item.title,
                item.author,
                item.content,
                item.link,
                item.receive_date,
                item.reply_count,
                item.fetched_at.to_rfc3339(),
            ],
        )?;
        Ok(n)
    }

    fn upsert_comment_tx(
        tx: &rusqlite::Transaction<'_>,
        stream: &Stream,
        item: &Comment,
    ) -> Result<usize> {
        let n = tx.execute(
            "INSERT INTO comments (id, source_id, native_id, stream_kind, stream_id,
                                   topic_native_id, parent_native_id, author, content, floor,
                                   created_at, like_count, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(source_id, native_id) DO UPDATE SET
                 stream_kind = excluded.stream_kind,
                 stream_id = excluded.stream_id,
                 topic_native_id = excluded.topic_native_id,
                 parent_native_id = excluded.parent_native_id,
                 author = excluded.author,
                 content = excluded.content,
                 floor = excluded.floor,
                 created_at = excluded.created_at,
                 like_count = excluded.like_count,
                 fetched_at = excluded.fetched_at",
            params![
                item.id,
                item.source_id,
                item.native_id,
                stream.kind.as_str(),
                stream.id,
                item.topic_native_id,
                item.parent_native_id,
                item.author,
                item.content,
                item.floor,
                item.created_at,
                item.like_count,
                item.fetched_at.to_rfc3339(),
            ],
        )?;
        Ok(n)
    }

    fn upsert_trend_tx(
        tx: &rusqlite::Transaction<'_>,
        stream: &Stream,
        item: &TrendItem,
    ) -> Result<usize> {
        let n = tx.execute(
            "INSERT INTO trend_items (id, source_id, native_id, stream_kind, stream_id, rank,
                                      title, summary, link, heat, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(source_id, native_id) DO UPDATE SET
                 stream_kind = excluded.stream_kind,
                 stream_id = excluded.stream_id,
                 rank = excluded.rank,
                 title = excluded.title,
                 summary = excluded.summary,
                 link = excluded.link,
                 heat = excluded.heat,
                 fetched_at = excluded.fetched_at",
            params![
                item.id,
                item.source_id,
                item.native_id,
                stream.kind.as_str(),
                stream.id,
                item.rank,
                item.title,
                item.summary,
                item.link,
                item.heat,
                item.fetched_at.to_rfc3339(),
            ],
        )?;
        Ok(n)
    }

    fn upsert_remote_key_tx(tx: &rusqlite::Transaction<'_>, key: &RemoteKey) -> Result<()> {
        tx.execute(
            "INSERT INTO remote_keys (type, id, prev_key, curr_key, next_key, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(type, id) DO UPDATE SET
                 prev_key = excluded.prev_key,
                 curr_key = excluded.curr_key,
                 next_key = excluded.next_key,
                 last_updated = excluded.last_updated",
            params![
                key.stream.kind.as_str(),
                key.stream.id,
                key.prev_key,
                key.curr_key,
                key.next_key,
                key.last_updated,
            ],
        )?;
        Ok(())
    }

    fn table_for(kind: StreamKind) -> &'static str {
        match kind {
            StreamKind::Topics => "topics",
            StreamKind::Comments => "comments",
            StreamKind::Trend => "trend_items",
        }
    }

    fn delete_stream_rows_tx(tx: &rusqlite::Transaction<'_>, stream: &Stream) -> Result<()> {
        let sql = format!(
            "DELETE FROM {} WHERE stream_kind = ?1 AND stream_id = ?2",
            Self::table_for(stream.kind)
        );
        tx.execute(&sql, params![stream.kind.as_str(), stream.id])?;
        Ok(())
    }
}

impl CacheStore for SqliteStore {
    fn add_source(&self, source: &SourceRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sources (id, kind, base_url, title, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 kind = excluded.kind,
                 base_url = excluded.base_url,
                 title = excluded.title",
            params![
                source.id,
                source.kind.as_str(),
                source.base_url,
                source.title,
                source.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_source(&self, id: &str) -> Result<Option<SourceRecord>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                "SELECT id, kind, base_url, title, created_at FROM sources WHERE id = ?1",
                params![id],
                |row| {
                    let kind: String = row.get(1)?;
                    Ok(SourceRecord {
                        id: row.get(0)?,
                        kind: SourceKind::parse(&kind).unwrap_or(SourceKind::Rss),
                        base_url: row.get(2)?,
                        title: row.get(3)?,
                        created_at: row
                            .get::<_, String>(4)
                            .ok()
                            .and_then(|s| Self::parse_datetime(&s))
                            .unwrap_or_else(Utc::now),
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    fn get_all_sources(&self) -> Result<Vec<SourceRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, kind, base_url, title, created_at FROM sources ORDER BY id")?;
        let sources = stmt
            .query_map([], |row| {
                let kind: String = row.get(1)?;
                Ok(SourceRecord {
                    id: row.get(0)?,
                    kind: SourceKind::parse(&kind).unwrap_or(SourceKind::Rss),
                    base_url: row.get(2)?,
                    title: row.get(3)?,
                    created_at: row
                        .get::<_, String>(4)
                        .ok()
                        .and_then(|s| Self::parse_datetime(&s))
                        .unwrap_or_else(Utc::now),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sources)
    }

    fn remove_source(&self, id: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM sources WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn save_topics(&self, stream: &Stream, items: &[Topic]) -> Result<usize> {
        let mut count = 0;
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            for item in items {
                count += Self::upsert_topic_tx(&tx, stream, item)?;
            }
            tx.commit()?;
        }
        self.publish(stream);
        Ok(count)
    }

    fn get_topic(&self, source_id: &str, native_id: &str) -> Result<Option<Topic>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                "SELECT id, source_id, native_id, title, author, content, link, receive_date,
                        reply_count, fetched_at
                 FROM topics WHERE source_id = ?1 AND native_id = ?2",
                params![source_id, native_id],
                Self::topic_from_row,
            )
            .optional()?;
        Ok(result)
    }

    fn topics_page(&self, stream: &Stream, offset: i64, limit: i64) -> Result<Vec<Topic>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, source_id, native_id, title, author, content, link, receive_date,
                    reply_count, fetched_at
             FROM topics WHERE stream_kind = ?1 AND stream_id = ?2
             ORDER BY receive_date DESC, native_id ASC
             LIMIT ?3 OFFSET ?4",
        )?;
        let items = stmt
            .query_map(
                params![stream.kind.as_str(), stream.id, limit, offset],
                Self::topic_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn commit_topic_page(
        &self,
        stream: &Stream,
        items: &[Topic],
        key: &RemoteKey,
        replace: bool,
    ) -> Result<()> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            if replace {
                Self::delete_stream_rows_tx(&tx, stream)?;
            }
            for item in items {
                Self::upsert_topic_tx(&tx, stream, item)?;
            }
            Self::upsert_remote_key_tx(&tx, key)?;
            tx.commit()?;
        }
        self.publish(stream);
        Ok(())
    }

    fn save_comments(&self, stream: &Stream, items: &[Comment]) -> Result<usize> {
        let mut count = 0;
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            for item in items {
                count += Self::upsert_comment_tx(&tx, stream, item)?;
            }
            tx.commit()?;
        }
        self.publish(stream);
        Ok(count)
    }

    fn get_comment(&self, source_id: &str, native_id: &str) -> Result<Option<Comment>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                "SELECT id, source_id, native_id, topic_native_id, parent_native_id, author,
                        content, floor, created_at, like_count, fetched_at
                 FROM comments WHERE source_id = ?1 AND native_id = ?2",
                params![source_id, native_id],
                Self::comment_from_row,
            )
            .optional()?;
        Ok(result)
    }

    fn comments_page(&self, stream: &Stream, offset: i64, limit: i64) -> Result<Vec<Comment>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, source_id, native_id, topic_native_id, parent_native_id, author,
                    content, floor, created_at, like_count, fetched_at
             FROM comments WHERE stream_kind = ?1 AND stream_id = ?2
             ORDER BY floor ASC, native_id ASC
             LIMIT ?3 OFFSET ?4",
        )?;
        let items = stmt
            .query_map(
                params![stream.kind.as_str(), stream.id, limit, offset],
                Self::comment_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn commit_comment_page(
        &self,
        stream: &Stream,
        items: &[Comment],
        key: &RemoteKey,
        replace: bool,
    ) -> Result<()> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            if replace {
                Self::delete_stream_rows_tx(&tx, stream)?;
            }
            for item in items {
                Self::upsert_comment_tx(&tx, stream, item)?;
            }
            Self::upsert_remote_key_tx(&tx, key)?;
            tx.commit()?;
        }
        self.publish(stream);
        Ok(())
    }

    fn save_trends(&self, stream: &Stream, items: &[TrendItem]) -> Result<usize> {
        let mut count = 0;
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            for item in items {
                count += Self::upsert_trend_tx(&tx, stream, item)?;
            }
            tx.commit()?;
        }
        self.publish(stream);
        Ok(count)
    }

    fn trends_page(&self, stream: &Stream, offset: i64, limit: i64) -> Result<Vec<TrendItem>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, source_id, native_id, rank, title, summary, link, heat, fetched_at
             FROM trend_items WHERE stream_kind = ?1 AND stream_id = ?2
             ORDER BY rank ASC
             LIMIT ?3 OFFSET ?4",
        )?;
        let items = stmt
            .query_map(
                params![stream.kind.as_str(), stream.id, limit, offset],
                Self::trend_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn commit_trend_page(
        &self,
        stream: &Stream,
        items: &[TrendItem],
        key: &RemoteKey,
        replace: bool,
    ) -> Result<()> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            if replace {
                Self::delete_stream_rows_tx(&tx, stream)?;
            }
            for item in items {
                Self::upsert_trend_tx(&tx, stream, item)?;
            }
            Self::upsert_remote_key_tx(&tx, key)?;
            tx.commit()?;
        }
        self.publish(stream);
        Ok(())
    }

    fn count_rows(&self, stream: &Stream) -> Result<i64> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE stream_kind = ?1 AND stream_id = ?2",
            Self::table_for(stream.kind)
        );
        let count: i64 = conn.query_row(&sql, params![stream.kind.as_str(), stream.id], |row| {
            row.get(0)
        })?;
        Ok(count)
    }

    fn clear_stream(&self, stream: &Stream) -> Result<()> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            Self::delete_stream_rows_tx(&tx, stream)?;
            tx.execute(
                "DELETE FROM remote_keys WHERE type = ?1 AND id = ?2",
                params![stream.kind.as_str(), stream.id],
            )?;
            tx.commit()?;
        }
        self.publish(stream);
        Ok(())
    }

    fn remote_key(&self, stream: &Stream) -> Result<Option<RemoteKey>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                "SELECT prev_key, curr_key, next_key, last_updated
                 FROM remote_keys WHERE type = ?1 AND id = ?2",
                params![stream.kind.as_str(), stream.id],
                |row| Self::remote_key_from_row(stream, row),
            )
            .optional()?;
        Ok(result)
    }

    fn upsert_remote_key(&self, key: &RemoteKey) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::upsert_remote_key_tx(&tx, key)?;
        tx.commit()?;
        Ok(())
    }

    fn touch_remote_key(&self, stream: &Stream, now: i64) -> Result<()> {
        let conn = self.lock()?;
        // Freshness ping: only the timestamp moves, page boundaries stay.
        conn.execute(
            "INSERT INTO remote_keys (type, id, curr_key, last_updated)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT(type, id) DO UPDATE SET last_updated = excluded.last_updated",
            params![stream.kind.as_str(), stream.id, now],
        )?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paging::now_millis;

    fn topic(source: &str, native: &str, date: i64) -> Topic {
        let mut t = Topic::new(source, native, date);
        t.title = Some(format!("topic {native}"));
        t
    }

    fn key_for(stream: &Stream, curr: i64, next: Option<i64>) -> RemoteKey {
        RemoteKey::new(stream.clone(), None, curr, next)
    }

    #[test]
    fn test_save_and_page_topics() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::topics("nmb:4");

        let items = vec![
            topic("nmb", "1", 100),
            topic("nmb", "2", 300),
            topic("nmb", "3", 200),
        ];
        store.save_topics(&stream, &items).unwrap();

        let page = store.topics_page(&stream, 0, 10).unwrap();
        assert_eq!(page.len(), 3);
        // Newest first
        assert_eq!(page[0].native_id, "2");
        assert_eq!(page[1].native_id, "3");
        assert_eq!(page[2].native_id, "1");
    }

    #[test]
    fn test_topics_page_tie_break() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::topics("nmb:4");

        store
            .save_topics(
                &stream,
                &[topic("nmb", "200", 100), topic("nmb", "100", 100)],
            )
            .unwrap();

        let page = store.topics_page(&stream, 0, 10).unwrap();
        assert_eq!(page[0].native_id, "100");
        assert_eq!(page[1].native_id, "200");
    }

    #[test]
    fn test_upsert_idempotent_latest_wins() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::topics("nmb:4");

        let mut t = topic("nmb", "1", 100);
        store.save_topics(&stream, std::slice::from_ref(&t)).unwrap();

        t.title = Some("updated".into());
        t.reply_count = 42;
        store.save_topics(&stream, std::slice::from_ref(&t)).unwrap();

        let page = store.topics_page(&stream, 0, 10).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, Some("updated".into()));
        assert_eq!(page[0].reply_count, 42);
    }

    #[test]
    fn test_commit_replace_semantics() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::topics("nmb:4");

        let a = topic("nmb", "A", 300);
        let c = topic("nmb", "C", 100);
        store
            .commit_topic_page(&stream, &[a.clone(), c], &key_for(&stream, 1, Some(2)), true)
            .unwrap();

        let b = topic("nmb", "B", 200);
        store
            .commit_topic_page(&stream, &[a, b], &key_for(&stream, 1, Some(2)), true)
            .unwrap();

        let page = store.topics_page(&stream, 0, 10).unwrap();
        let ids: Vec<&str> = page.iter().map(|t| t.native_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_commit_append_keeps_existing() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::topics("nmb:4");

        store
            .commit_topic_page(
                &stream,
                &[topic("nmb", "A", 300)],
                &key_for(&stream, 1, Some(2)),
                true,
            )
            .unwrap();
        store
            .commit_topic_page(
                &stream,
                &[topic("nmb", "B", 200)],
                &key_for(&stream, 2, Some(3)),
                false,
            )
            .unwrap();

        assert_eq!(store.count_rows(&stream).unwrap(), 2);
        let rk = store.remote_key(&stream).unwrap().unwrap();
        assert_eq!(rk.curr_key, 2);
        assert_eq!(rk.next_key, Some(3));
    }

    #[test]
    fn test_remote_key_single_row_per_stream() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::trend("nmb_hot");

        store
            .upsert_remote_key(&RemoteKey::new(stream.clone(), None, 1, Some(2)))
            .unwrap();
        store
            .upsert_remote_key(&RemoteKey::new(stream.clone(), Some(1), 2, Some(3)))
            .unwrap();

        let rk = store.remote_key(&stream).unwrap().unwrap();
        assert_eq!(rk.prev_key, Some(1));
        assert_eq!(rk.curr_key, 2);
        assert_eq!(rk.next_key, Some(3));
    }

    #[test]
    fn test_touch_leaves_boundaries() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::trend("nmb_hot");

        store
            .upsert_remote_key(&RemoteKey {
                stream: stream.clone(),
                prev_key: Some(1),
                curr_key: 2,
                next_key: Some(3),
                last_updated: 1000,
            })
            .unwrap();

        let now = now_millis();
        store.touch_remote_key(&stream, now).unwrap();

        let rk = store.remote_key(&stream).unwrap().unwrap();
        assert_eq!(rk.prev_key, Some(1));
        assert_eq!(rk.curr_key, 2);
        assert_eq!(rk.next_key, Some(3));
        assert_eq!(rk.last_updated, now);
    }

    #[test]
    fn test_touch_creates_row_when_missing() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::trend("nmb_hot");

        store.touch_remote_key(&stream, 5000).unwrap();
        let rk = store.remote_key(&stream).unwrap().unwrap();
        assert_eq!(rk.last_updated, 5000);
        assert_eq!(rk.prev_key, None);
        assert_eq!(rk.next_key, None);
    }

    #[test]
    fn test_clear_stream_drops_rows_and_key() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::topics("nmb:4");

        store
            .commit_topic_page(
                &stream,
                &[topic("nmb", "1", 100)],
                &key_for(&stream, 1, None),
                true,
            )
            .unwrap();
        assert_eq!(store.count_rows(&stream).unwrap(), 1);

        store.clear_stream(&stream).unwrap();
        assert_eq!(store.count_rows(&stream).unwrap(), 0);
        assert!(store.remote_key(&stream).unwrap().is_none());
    }

    #[test]
    fn test_clear_stream_scoped() {
        let store = SqliteStore::in_memory().unwrap();
        let a = Stream::topics("nmb:4");
        let b = Stream::topics("nmb:6");

        store
            .commit_topic_page(&a, &[topic("nmb", "1", 100)], &key_for(&a, 1, None), true)
            .unwrap();
        store
            .commit_topic_page(&b, &[topic("nmb", "2", 100)], &key_for(&b, 1, None), true)
            .unwrap();

        store.clear_stream(&a).unwrap();
        assert_eq!(store.count_rows(&a).unwrap(), 0);
        assert_eq!(store.count_rows(&b).unwrap(), 1);
    }

    #[test]
    fn test_comments_page_ordering() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::comments("nmb:t100");

        let mut items = Vec::new();
        for (native, floor) in [("r3", 3), ("r1", 1), ("r2", 2)] {
            items.push(Comment::new("nmb", native, "t100", floor));
        }
        store.save_comments(&stream, &items).unwrap();

        let page = store.comments_page(&stream, 0, 10).unwrap();
        let floors: Vec<i64> = page.iter().map(|c| c.floor).collect();
        assert_eq!(floors, vec![1, 2, 3]);
    }

    #[test]
    fn test_comments_window() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::comments("nmb:t100");

        let items: Vec<Comment> = (1..=5)
            .map(|i| Comment::new("nmb", &format!("r{i}"), "t100", i))
            .collect();
        store.save_comments(&stream, &items).unwrap();

        let page = store.comments_page(&stream, 2, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].floor, 3);
        assert_eq!(page[1].floor, 4);
    }

    #[test]
    fn test_trends_rank_order() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::trend("nmb_hot");

        let items = vec![
            TrendItem::new("nmb", "b", 2),
            TrendItem::new("nmb", "a", 1),
            TrendItem::new("nmb", "c", 3),
        ];
        store.save_trends(&stream, &items).unwrap();

        let page = store.trends_page(&stream, 0, 10).unwrap();
        let natives: Vec<&str> = page.iter().map(|t| t.native_id.as_str()).collect();
        assert_eq!(natives, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sources_crud() {
        let store = SqliteStore::in_memory().unwrap();

        let src = SourceRecord::new("nmb", SourceKind::ForumRest, "https://api.example.com");
        store.add_source(&src).unwrap();

        let got = store.get_source("nmb").unwrap().unwrap();
        assert_eq!(got.kind, SourceKind::ForumRest);
        assert_eq!(got.base_url, "https://api.example.com");

        assert_eq!(store.get_all_sources().unwrap().len(), 1);

        store.remove_source("nmb").unwrap();
        assert!(store.get_source("nmb").unwrap().is_none());
    }

    #[test]
    fn test_get_topic_by_identity() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::topics("nmb:4");
        store
            .save_topics(&stream, &[topic("nmb", "77", 100)])
            .unwrap();

        assert!(store.get_topic("nmb", "77").unwrap().is_some());
        assert!(store.get_topic("other", "77").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_subscribe_sees_commits() {
        let store = SqliteStore::in_memory().unwrap();
        let stream = Stream::topics("nmb:4");
        let mut rx = store.subscribe();

        store
            .commit_topic_page(
                &stream,
                &[topic("nmb", "1", 100)],
                &key_for(&stream, 1, None),
                true,
            )
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.stream, stream);
    }

    #[test]
    fn test_disk_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("estuary.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            let stream = Stream::topics("nmb:4");
            store
                .save_topics(&stream, &[topic("nmb", "1", 100)])
                .unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        let stream = Stream::topics("nmb:4");
        assert_eq!(store.count_rows(&stream).unwrap(), 1);
    }
}
