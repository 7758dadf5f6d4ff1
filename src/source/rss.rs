use async_trait::async_trait;
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::domain::Topic;
use crate::paging::{now_millis, LoadDirection, Page, Stream};
use crate::source::{FetchError, FetchResult, HttpClient, SourceAdapter, SourceCapabilities};

/// Adapter for RSS/Atom feeds.
///
/// Feeds have no native pagination: every fetch is the whole document and
/// the returned page carries `end_reached = true`.
pub struct RssAdapter {
    source_id: String,
    feed_url: String,
    client: HttpClient,
    /// When true, an entry without a parseable publish date fails the fetch
    /// with `MalformedResponse` instead of being stamped with the current
    /// time.
    strict_dates: bool,
}

impl RssAdapter {
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

    fn normalize(&self, body: &[u8]) -> FetchResult<Vec<Topic>> {
        let feed = parser::parse(body)
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

        let mut items = Vec::with_capacity(feed.entries.len());
        for entry in feed.entries {
            let link = entry.links.first().map(|l| l.href.clone());
            let native_id = if entry.id.is_empty() {
                link.clone().unwrap_or_default()
            } else {
                entry.id.clone()
            };
            if native_id.is_empty() {
                continue;
            }

            let published = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.timestamp_millis());
            let receive_date = match published {
                Some(ms) => ms,
                None if self.strict_dates => {
                    return Err(FetchError::MalformedResponse(format!(
                        "entry {native_id} has no parseable publish date"
                    )));
                }
                None => now_millis(),
            };

            let mut topic = Topic::new(&self.source_id, &native_id, receive_date);
            topic.title = entry
                .title
                .map(|t| decode_html_entities(&t.content).to_string());
            topic.link = link;
            topic.content = entry
                .content
                .and_then(|c| c.body)
                .map(|b| decode_html_entities(&b).to_string())
                .or_else(|| {
                    entry
                        .summary
                        .map(|s| decode_html_entities(&s.content).to_string())
                });
            topic.author = entry.authors.first().map(|a| a.name.clone());
            items.push(topic);
        }

        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
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
        let body = self.client.get_bytes(&self.feed_url).await?;
        Ok(Page::single(self.normalize(&body)?))
    }
}
