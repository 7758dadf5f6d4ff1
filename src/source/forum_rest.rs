use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use serde::Deserialize;

use crate::domain::{Comment, Forum, ThreadDetail, Topic, TrendItem};
use crate::paging::{now_millis, LoadDirection, Page, Stream};
use crate::source::{FetchError, FetchResult, HttpClient, SourceAdapter, SourceCapabilities};

/// Replies per thread page served by the backend.
const REPLY_PAGE_SIZE: i64 = 20;

/// Adapter for an NMB-style anonymous forum REST API.
///
/// Pagination is by page number starting at 1; the topic stream ID is the
/// forum's native ID and the comment stream ID is the thread's native ID.
pub struct ForumRestAdapter {
    source_id: String,
    base_url: String,
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct ApiThread {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "user_hash", alias = "userid")]
    user_hash: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    now: Option<String>,
    #[serde(default, alias = "ReplyCount", alias = "replyCount")]
    reply_count: i64,
    #[serde(default, alias = "Replies", alias = "replys")]
    replies: Vec<ApiReply>,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    id: i64,
    #[serde(default, alias = "user_hash", alias = "userid")]
    user_hash: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    now: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiForumGroup {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "forums")]
    forums: Vec<ApiForum>,
}

#[derive(Debug, Deserialize)]
struct ApiForum {
    id: i64,
    name: String,
    #[serde(default, alias = "msg")]
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTrendEntry {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, alias = "hot")]
    hot: i64,
}

impl ForumRestAdapter {
    pub fn new(source_id: &str, base_url: &str, client: HttpClient) -> Self {
        Self {
            source_id: source_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn topic_from_api(&self, t: &ApiThread) -> Topic {
        let mut topic = Topic::new(
            &self.source_id,
            &t.id.to_string(),
            t.now
                .as_deref()
                .and_then(parse_forum_time)
                .unwrap_or_else(now_millis),
        );
        topic.title = t.title.clone().filter(|s| !s.is_empty() && s != "无标题");
        topic.author = t.user_hash.clone();
        topic.content = t.content.clone();
        topic.reply_count = t.reply_count;
        topic
    }

    fn comment_from_api(&self, topic_id: &str, floor: i64, r: &ApiReply) -> Comment {
        let mut comment = Comment::new(&self.source_id, &r.id.to_string(), topic_id, floor);
        comment.author = r.user_hash.clone();
        comment.content = r.content.clone();
        comment.created_at = r
            .now
            .as_deref()
            .and_then(parse_forum_time)
            .unwrap_or_else(now_millis);
        comment
    }

    fn page_boundaries<T>(key: i64, items: &[T]) -> (Option<i64>, Option<i64>, bool) {
        let prev = (key > 1).then(|| key - 1);
        let next = (!items.is_empty()).then(|| key + 1);
        (prev, next, items.is_empty())
    }
}

#[async_trait]
impl SourceAdapter for ForumRestAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            po_filter: true,
            page_jump: true,
            ..Default::default()
        }
    }

    async fn fetch_topics(
        &self,
        stream: &Stream,
        _direction: LoadDirection,
        key: i64,
    ) -> FetchResult<Page<Topic>> {
        let url = format!("{}/api/showf?id={}&page={}", self.base_url, stream.id, key);
        let threads: Vec<ApiThread> = self.client.get_json(&url).await?;

        let items: Vec<Topic> = threads.iter().map(|t| self.topic_from_api(t)).collect();
        let (prev_key, next_key, end_reached) = Self::page_boundaries(key, &items);
        Ok(Page {
            items,
            prev_key,
            next_key,
            end_reached,
        })
    }

    async fn fetch_comments(
        &self,
        stream: &Stream,
        _direction: LoadDirection,
        key: i64,
    ) -> FetchResult<Page<Comment>> {
        let url = format!("{}/api/thread?id={}&page={}", self.base_url, stream.id, key);
        let thread: ApiThread = self.client.get_json(&url).await?;

        let base_floor = (key - 1) * REPLY_PAGE_SIZE;
        let items: Vec<Comment> = thread
            .replies
            .iter()
            .enumerate()
            .map(|(i, r)| self.comment_from_api(&stream.id, base_floor + i as i64 + 1, r))
            .collect();

        let (prev_key, next_key, end_reached) = Self::page_boundaries(key, &items);
        Ok(Page {
            items,
            prev_key,
            next_key,
            end_reached,
        })
    }

    async fn fetch_trends(
        &self,
        _stream: &Stream,
        _direction: LoadDirection,
        key: i64,
    ) -> FetchResult<Page<TrendItem>> {
        let url = format!("{}/api/hot?page={}", self.base_url, key);
        let entries: Vec<ApiTrendEntry> = self.client.get_json(&url).await?;

        let base_rank = (key - 1) * REPLY_PAGE_SIZE;
        let items: Vec<TrendItem> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let mut item =
                    TrendItem::new(&self.source_id, &e.id.to_string(), base_rank + i as i64 + 1);
                item.title = e.title.clone();
                item.summary = e.content.clone();
                item.heat = e.hot;
                item
            })
            .collect();

        let (prev_key, next_key, end_reached) = Self::page_boundaries(key, &items);
        Ok(Page {
            items,
            prev_key,
            next_key,
            end_reached,
        })
    }

    async fn get_forums(&self) -> FetchResult<Vec<Forum>> {
        let url = format!("{}/api/getForumList", self.base_url);
        let groups: Vec<ApiForumGroup> = self.client.get_json(&url).await?;

        let forums = groups
            .into_iter()
            .flat_map(|g| {
                let group_name = g.name;
                g.forums.into_iter().map(move |f| Forum {
                    native_id: f.id.to_string(),
                    name: f.name,
                    description: f.msg,
                    group: group_name.clone(),
                })
            })
            .collect();
        Ok(forums)
    }

    async fn get_thread_detail(&self, native_id: &str) -> FetchResult<ThreadDetail> {
        let url = format!("{}/api/thread?id={}&page=1", self.base_url, native_id);
        let thread: ApiThread = self.client.get_json(&url).await?;

        if thread.id.to_string() != native_id {
            return Err(FetchError::MalformedResponse(format!(
                "thread {} returned id {}",
                native_id, thread.id
            )));
        }

        let topic = self.topic_from_api(&thread);
        let max_page = (thread.reply_count + REPLY_PAGE_SIZE - 1) / REPLY_PAGE_SIZE;
        Ok(ThreadDetail {
            topic,
            max_page: max_page.max(1),
        })
    }
}

/// Parse the backend's `"2024-01-01(月)12:00:00"` timestamp format.
///
/// The parenthesized weekday is decorative; times are UTC+8.
fn parse_forum_time(s: &str) -> Option<i64> {
    let cleaned = match (s.find('('), s.find(')')) {
        (Some(open), Some(close)) if close > open => {
            format!("{} {}", &s[..open], &s[close + 1..])
        }
        _ => s.to_string(),
    };

    let naive = NaiveDateTime::parse_from_str(cleaned.trim(), "%Y-%m-%d %H:%M:%S").ok()?;
    let offset = FixedOffset::east_opt(8 * 3600)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forum_time() {
        let ms = parse_forum_time("2024-01-01(月)08:00:00").unwrap();
        // 08:00 UTC+8 is midnight UTC
        assert_eq!(ms, 1704067200000);
    }

    #[test]
    fn test_parse_forum_time_without_weekday() {
        assert!(parse_forum_time("2024-01-01 08:00:00").is_some());
    }

    #[test]
    fn test_parse_forum_time_garbage() {
        assert!(parse_forum_time("not a time").is_none());
    }

    #[test]
    fn test_api_thread_deserialization() {
        let json = r#"{
            "id": 123,
            "title": "hello",
            "user_hash": "abcDEF",
            "content": "first post",
            "now": "2024-01-01(月)08:00:00",
            "ReplyCount": 41,
            "Replies": [
                {"id": 456, "user_hash": "xyz", "content": "reply", "now": "2024-01-01(月)09:00:00"}
            ]
        }"#;
        let thread: ApiThread = serde_json::from_str(json).unwrap();
        assert_eq!(thread.id, 123);
        assert_eq!(thread.reply_count, 41);
        assert_eq!(thread.replies.len(), 1);
        assert_eq!(thread.replies[0].id, 456);
    }

    #[test]
    fn test_page_boundaries() {
        let items = vec![1, 2, 3];
        assert_eq!(
            ForumRestAdapter::page_boundaries(1, &items),
            (None, Some(2), false)
        );
        assert_eq!(
            ForumRestAdapter::page_boundaries(3, &items),
            (Some(2), Some(4), false)
        );
        let empty: Vec<i32> = vec![];
        assert_eq!(
            ForumRestAdapter::page_boundaries(5, &empty),
            (Some(4), None, true)
        );
    }

    #[test]
    fn test_topic_from_api_untitled_filtered() {
        let adapter = ForumRestAdapter::new("nmb", "https://api.example.com", HttpClient::new());
        let thread = ApiThread {
            id: 1,
            title: Some("无标题".into()),
            user_hash: Some("h".into()),
            content: Some("body".into()),
            now: None,
            reply_count: 0,
            replies: vec![],
        };
        let topic = adapter.topic_from_api(&thread);
        assert_eq!(topic.title, None);
        assert_eq!(topic.native_id, "1");
    }

    #[test]
    fn test_capabilities_static() {
        let adapter = ForumRestAdapter::new("nmb", "https://api.example.com", HttpClient::new());
        assert_eq!(adapter.capabilities(), adapter.capabilities());
        assert!(adapter.capabilities().po_filter);
        assert!(!adapter.capabilities().voting);
    }
}
