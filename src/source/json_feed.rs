use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::Topic;
use crate::paging::{now_millis, LoadDirection, Page, Stream};
use crate::source::{
    parse_date_millis, FetchError, FetchResult, HttpClient, SourceAdapter, SourceCapabilities,
};

/// Adapter for JSON Feed 1.x documents.
///
/// Like RSS, a JSON feed is a single whole document; every fetch returns
/// one page with `end_reached = true`.
pub struct JsonFeedAdapter {
    source_id: String,
    feed_url: String,
    client: HttpClient,
    strict_dates: bool,
}

#[derive(Debug, Deserialize)]
struct JsonFeed {
    #[serde(default)]
    items: Vec<JsonFeedItem>,
}

#[derive(Debug, Deserialize)]
struct JsonFeedItem {
    /// JSON Feed allows both strings and numbers here.
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content_html: Option<String>,
    #[serde(default)]
    content_text: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    date_published: Option<String>,
    #[serde(default)]
    authors: Vec<JsonFeedAuthor>,
    #[serde(default)]
    author: Option<JsonFeedAuthor>,
}

#[derive(Debug, Deserialize)]
struct JsonFeedAuthor {
    #[serde(default)]
    name: Option<String>,
}

impl JsonFeedAdapter {
    pub fn new(source_id: &str, feed_url: &str, client: HttpClient) -> Self {
        Self {
            source_id: source_id.to_string(),
            feed_url: feed_url.to_string(),
            client,
            strict_dates: false,
        }
    }

    pub fn with_strict_dates(mut self, strict: bool) -> Self {
        self.strict_dates = strict;
        self
    }

    fn item_id(item: &JsonFeedItem) -> Option<String> {
        match &item.id {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => item.url.clone().filter(|u| !u.is_empty()),
        }
    }

    fn normalize(&self, feed: JsonFeed) -> FetchResult<Vec<Topic>> {
        let mut items = Vec::with_capacity(feed.items.len());
        for entry in feed.items {
            let Some(native_id) = Self::item_id(&entry) else {
                continue;
            };

            let published = entry.date_published.as_deref().and_then(parse_date_millis);
            let receive_date = match published {
                Some(ms) => ms,
                None if self.strict_dates => {
                    return Err(FetchError::MalformedResponse(format!(
                        "item {native_id} has no parseable date_published"
                    )));
                }
                None => now_millis(),
            };

            let mut topic = Topic::new(&self.source_id, &native_id, receive_date);
            topic.title = entry.title;
            topic.link = entry.url;
            topic.content = entry
                .content_html
                .or(entry.content_text)
                .or(entry.summary);
            topic.author = entry
                .authors
                .into_iter()
                .filter_map(|a| a.name)
                .next()
                .or(entry.author.and_then(|a| a.name));
            items.push(topic);
        }
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for JsonFeedAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::default()
    }

    async fn fetch_topics(
        &self,
        _stream: &Stream,
        _direction: LoadDirection,
        _key: i64,
    ) -> FetchResult<Page<Topic>> {
        let feed: JsonFeed = self.client.get_json(&self.feed_url).await?;
        Ok(Page::single(self.normalize(feed)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED_SAMPLE: &str = r#"{
        "version": "https://jsonfeed.org/version/1.1",
        "title": "Example",
        "items": [
            {"id": "1", "url": "https://example.com/1", "title": "First",
             "content_html": "<p>one</p>", "date_published": "2024-01-01T00:00:00Z",
             "authors": [{"name": "alice"}]},
            {"id": 2, "title": "Numeric id, no date", "content_text": "two"},
            {"title": "No id at all"}
        ]
    }"#;

    fn adapter() -> JsonFeedAdapter {
        JsonFeedAdapter::new("jf", "https://example.com/feed.json", HttpClient::new())
    }

    #[test]
    fn test_normalize_basic() {
        let feed: JsonFeed = serde_json::from_str(FEED_SAMPLE).unwrap();
        let items = adapter().normalize(feed).unwrap();

        // The id-less item is skipped, not substituted
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, Some("First".into()));
        assert_eq!(items[0].author, Some("alice".into()));
        assert_eq!(items[0].receive_date, 1704067200000);
    }

    #[test]
    fn test_numeric_id_coerced() {
        let feed: JsonFeed = serde_json::from_str(FEED_SAMPLE).unwrap();
        let items = adapter().normalize(feed).unwrap();
        assert_eq!(items[1].native_id, "2");
    }

    #[test]
    fn test_strict_dates() {
        let feed: JsonFeed = serde_json::from_str(FEED_SAMPLE).unwrap();
        let result = adapter().with_strict_dates(true).normalize(feed);
        assert!(matches!(result, Err(FetchError::MalformedResponse(_))));
    }

    #[test]
    fn test_content_precedence() {
        let json = r#"{"items": [{"id": "x", "content_text": "plain", "summary": "sum"}]}"#;
        let feed: JsonFeed = serde_json::from_str(json).unwrap();
        let items = adapter().normalize(feed).unwrap();
        assert_eq!(items[0].content, Some("plain".into()));
    }
}
