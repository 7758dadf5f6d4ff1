use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{Comment, Forum, ThreadDetail, Topic, TrendItem};
use crate::paging::{now_millis, LoadDirection, Page, Stream};
use crate::source::{parse_date_millis, FetchResult, HttpClient, SourceAdapter, SourceCapabilities};

/// Posts per chunk served by `/t/{id}.json`.
const POST_PAGE_SIZE: usize = 20;

/// Adapter for a Discourse-style JSON API.
///
/// Topic listings come from `/latest.json` (externally 1-based pages mapped
/// to Discourse's 0-based `page` parameter); replies from `/t/{id}.json`.
pub struct DiscourseAdapter {
    source_id: String,
    base_url: String,
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    topic_list: TopicList,
}

#[derive(Debug, Deserialize)]
struct TopicList {
    #[serde(default)]
    topics: Vec<ApiTopic>,
    #[serde(default)]
    more_topics_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTopic {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    bumped_at: Option<String>,
    #[serde(default)]
    posts_count: i64,
    #[serde(default)]
    last_poster_username: Option<String>,
    #[serde(default)]
    views: i64,
}

#[derive(Debug, Deserialize)]
struct TopicResponse {
    #[serde(default)]
    title: Option<String>,
    post_stream: PostStream,
    #[serde(default)]
    posts_count: i64,
}

#[derive(Debug, Deserialize)]
struct PostStream {
    #[serde(default)]
    posts: Vec<ApiPost>,
}

#[derive(Debug, Deserialize)]
struct ApiPost {
    id: i64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    cooked: Option<String>,
    post_number: i64,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    reply_to_post_number: Option<i64>,
    #[serde(default)]
    like_count: i64,
}

#[derive(Debug, Deserialize)]
struct CategoriesResponse {
    category_list: CategoryList,
}

#[derive(Debug, Deserialize)]
struct CategoryList {
    #[serde(default)]
    categories: Vec<ApiCategory>,
}

#[derive(Debug, Deserialize)]
struct ApiCategory {
    id: i64,
    name: String,
    #[serde(default)]
    description_text: Option<String>,
}

impl DiscourseAdapter {
    pub fn new(source_id: &str, base_url: &str, client: HttpClient) -> Self {
        Self {
            source_id: source_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn topic_from_api(&self, t: &ApiTopic) -> Topic {
        let mut topic = Topic::new(
            &self.source_id,
            &t.id.to_string(),
            t.bumped_at
                .as_deref()
                .and_then(parse_date_millis)
                .unwrap_or_else(now_millis),
        );
        topic.title = t.title.clone();
        topic.content = t.excerpt.clone();
        topic.author = t.last_poster_username.clone();
        topic.reply_count = (t.posts_count - 1).max(0);
        topic.link = Some(format!("{}/t/{}", self.base_url, t.id));
        topic
    }
}

#[async_trait]
impl SourceAdapter for DiscourseAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities {
            sub_comments: true,
            voting: true,
            page_jump: true,
            polls: true,
            ..Default::default()
        }
    }

    async fn fetch_topics(
        &self,
        _stream: &Stream,
        _direction: LoadDirection,
        key: i64,
    ) -> FetchResult<Page<Topic>> {
        let url = format!("{}/latest.json?page={}", self.base_url, (key - 1).max(0));
        let response: LatestResponse = self.client.get_json(&url).await?;

        let items: Vec<Topic> = response
            .topic_list
            .topics
            .iter()
            .map(|t| self.topic_from_api(t))
            .collect();

        let has_more = response.topic_list.more_topics_url.is_some() && !items.is_empty();
        Ok(Page {
            end_reached: items.is_empty(),
            prev_key: (key > 1).then(|| key - 1),
            next_key: has_more.then(|| key + 1),
            items,
        })
    }

    async fn fetch_comments(
        &self,
        stream: &Stream,
        _direction: LoadDirection,
        key: i64,
    ) -> FetchResult<Page<Comment>> {
        let url = format!("{}/t/{}.json?page={}", self.base_url, stream.id, key);
        let response: TopicResponse = self.client.get_json(&url).await?;

        let items: Vec<Comment> = response
            .post_stream
            .posts
            .iter()
            .map(|p| {
                let mut c = Comment::new(
                    &self.source_id,
                    &p.id.to_string(),
                    &stream.id,
                    p.post_number,
                );
                c.author = p.username.clone();
                c.content = p.cooked.clone();
                c.created_at = p
                    .created_at
                    .as_deref()
                    .and_then(parse_date_millis)
                    .unwrap_or_else(now_millis);
                c.like_count = p.like_count;
                c.parent_native_id = p.reply_to_post_number.map(|n| n.to_string());
                c
            })
            .collect();

        let full_chunk = items.len() >= POST_PAGE_SIZE;
        Ok(Page {
            end_reached: items.is_empty(),
            prev_key: (key > 1).then(|| key - 1),
            next_key: full_chunk.then(|| key + 1),
            items,
        })
    }

    async fn fetch_trends(
        &self,
        _stream: &Stream,
        _direction: LoadDirection,
        _key: i64,
    ) -> FetchResult<Page<TrendItem>> {
        let url = format!("{}/top.json", self.base_url);
        let response: LatestResponse = self.client.get_json(&url).await?;

        let items: Vec<TrendItem> = response
            .topic_list
            .topics
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mut item =
                    TrendItem::new(&self.source_id, &t.id.to_string(), i as i64 + 1);
                item.title = t.title.clone();
                item.summary = t.excerpt.clone();
                item.link = Some(format!("{}/t/{}", self.base_url, t.id));
                item.heat = t.views;
                item
            })
            .collect();

        Ok(Page::single(items))
    }

    async fn get_forums(&self) -> FetchResult<Vec<Forum>> {
        let url = format!("{}/categories.json", self.base_url);
        let response: CategoriesResponse = self.client.get_json(&url).await?;

        Ok(response
            .category_list
            .categories
            .into_iter()
            .map(|c| Forum {
                native_id: c.id.to_string(),
                name: c.name,
                description: c.description_text,
                group: None,
            })
            .collect())
    }

    async fn get_thread_detail(&self, native_id: &str) -> FetchResult<ThreadDetail> {
        let url = format!("{}/t/{}.json", self.base_url, native_id);
        let response: TopicResponse = self.client.get_json(&url).await?;

        let first_post = response.post_stream.posts.first();
        let mut topic = Topic::new(
            &self.source_id,
            native_id,
            first_post
                .and_then(|p| p.created_at.as_deref())
                .and_then(parse_date_millis)
                .unwrap_or_else(now_millis),
        );
        topic.title = response.title;
        topic.author = first_post.and_then(|p| p.username.clone());
        topic.content = first_post.and_then(|p| p.cooked.clone());
        topic.reply_count = (response.posts_count - 1).max(0);

        let max_page =
            (response.posts_count + POST_PAGE_SIZE as i64 - 1) / POST_PAGE_SIZE as i64;
        Ok(ThreadDetail {
            topic,
            max_page: max_page.max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LATEST_SAMPLE: &str = r#"{
        "topic_list": {
            "more_topics_url": "/latest?page=1",
            "topics": [
                {"id": 10, "title": "First", "bumped_at": "2024-01-02T00:00:00Z",
                 "posts_count": 5, "last_poster_username": "alice", "views": 100},
                {"id": 11, "title": "Second", "bumped_at": "2024-01-01T00:00:00Z",
                 "posts_count": 1, "last_poster_username": "bob", "views": 7}
            ]
        }
    }"#;

    #[test]
    fn test_latest_deserialization() {
        let response: LatestResponse = serde_json::from_str(LATEST_SAMPLE).unwrap();
        assert_eq!(response.topic_list.topics.len(), 2);
        assert!(response.topic_list.more_topics_url.is_some());
    }

    #[test]
    fn test_topic_mapping() {
        let response: LatestResponse = serde_json::from_str(LATEST_SAMPLE).unwrap();
        let adapter = DiscourseAdapter::new("meta", "https://forum.example.com", HttpClient::new());
        let topic = adapter.topic_from_api(&response.topic_list.topics[0]);

        assert_eq!(topic.native_id, "10");
        assert_eq!(topic.title, Some("First".into()));
        assert_eq!(topic.reply_count, 4);
        assert_eq!(topic.receive_date, 1704153600000);
        assert_eq!(topic.link, Some("https://forum.example.com/t/10".into()));
    }

    #[test]
    fn test_post_deserialization() {
        let json = r#"{
            "title": "Thread",
            "posts_count": 3,
            "post_stream": {
                "posts": [
                    {"id": 1, "username": "alice", "cooked": "<p>hi</p>", "post_number": 1,
                     "created_at": "2024-01-01T00:00:00Z", "like_count": 2},
                    {"id": 2, "username": "bob", "cooked": "<p>yo</p>", "post_number": 2,
                     "created_at": "2024-01-01T01:00:00Z", "reply_to_post_number": 1}
                ]
            }
        }"#;
        let response: TopicResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.post_stream.posts.len(), 2);
        assert_eq!(response.post_stream.posts[1].reply_to_post_number, Some(1));
    }

    #[test]
    fn test_capabilities() {
        let adapter = DiscourseAdapter::new("meta", "https://forum.example.com", HttpClient::new());
        let caps = adapter.capabilities();
        assert!(caps.voting);
        assert!(caps.sub_comments);
        assert!(!caps.po_filter);
    }
}
