use async_trait::async_trait;
use html_escape::decode_html_entities;

use crate::domain::Topic;
use crate::paging::{now_millis, LoadDirection, Page, Stream};
use crate::source::{
    parse_date_millis, FetchError, FetchResult, HttpClient, SourceAdapter, SourceCapabilities,
};

/// Adapter that scrapes an article listing out of a plain HTML page.
///
/// Looks for `<article>` blocks first and falls back to `<h2>`-wrapped
/// links. Whole-document semantics like the feed adapters: one page,
/// `end_reached = true`.
pub struct HtmlAdapter {
    source_id: String,
    page_url: String,
    client: HttpClient,
    strict_dates: bool,
}

impl HtmlAdapter {
    pub fn new(source_id: &str, page_url: &str, client: HttpClient) -> Self {
        Self {
            source_id: source_id.to_string(),
            page_url: page_url.to_string(),
            client,
            strict_dates: false,
        }
    }

    pub fn with_strict_dates(mut self, strict: bool) -> Self {
        self.strict_dates = strict;
        self
    }

    fn normalize(&self, html: &str) -> FetchResult<Vec<Topic>> {
        let mut blocks = extract_blocks(html, "article");
        if blocks.is_empty() {
            blocks = extract_blocks(html, "h2");
        }
        if blocks.is_empty() {
            return Err(FetchError::MalformedResponse(
                "no article or heading blocks found".into(),
            ));
        }

        let mut items = Vec::with_capacity(blocks.len());
        for block in blocks {
            let Some((href, text)) = first_anchor(block) else {
                continue;
            };
            let link = resolve_href(&self.page_url, &href);
            let title = decode_html_entities(text.trim()).to_string();

            let published = time_datetime(block).as_deref().and_then(parse_date_millis);
            let receive_date = match published {
                Some(ms) => ms,
                None if self.strict_dates => {
                    return Err(FetchError::MalformedResponse(format!(
                        "entry {link} has no parseable <time> datetime"
                    )));
                }
                None => now_millis(),
            };

            let mut topic = Topic::new(&self.source_id, &link, receive_date);
            topic.title = (!title.is_empty()).then_some(title);
            topic.link = Some(link);
            items.push(topic);
        }

        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for HtmlAdapter {
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
        let html = self.client.get_text(&self.page_url).await?;
        Ok(Page::single(self.normalize(&html)?))
    }
}

/// Slice out every `<tag ...>...</tag>` block, case-insensitively.
fn extract_blocks<'a>(html: &'a str, tag: &str) -> Vec<&'a str> {
    let lower = html.to_ascii_lowercase();
    let open_a = format!("<{tag} ");
    let open_b = format!("<{tag}>");
    let close = format!("</{tag}>");

    let mut blocks = Vec::new();
    let mut pos = 0;
    while pos < lower.len() {
        let rel = match (lower[pos..].find(&open_a), lower[pos..].find(&open_b)) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => break,
        };
        let start = pos + rel;
        let Some(end) = lower[start..].find(&close).map(|i| start + i) else {
            break;
        };
        blocks.push(&html[start..end]);
        pos = end + close.len();
    }
    blocks
}

/// First `<a href="...">text</a>` within a block.
fn first_anchor(block: &str) -> Option<(String, &str)> {
    let lower = block.to_ascii_lowercase();
    let a_start = lower.find("<a ")?;
    let tag_end = lower[a_start..].find('>')? + a_start;
    let href = attr_value(&block[a_start..tag_end], "href")?;
    let text_end = lower[tag_end..].find("</a>")? + tag_end;
    Some((href, &block[tag_end + 1..text_end]))
}

/// `datetime` attribute of the first `<time>` element in a block.
fn time_datetime(block: &str) -> Option<String> {
    let lower = block.to_ascii_lowercase();
    let t_start = lower.find("<time")?;
    let tag_end = lower[t_start..].find('>')? + t_start;
    attr_value(&block[t_start..tag_end], "datetime")
}

/// Pull `name="value"` (or single-quoted) out of a raw tag slice.
fn attr_value(tag: &str, name: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let needle = format!("{name}=");
    let at = lower.find(&needle)? + needle.len();
    let rest = &tag[at..];
    let (quote, rest) = match rest.chars().next()? {
        c @ ('"' | '\'') => (c, &rest[1..]),
        _ => return None,
    };
    let end = rest.find(quote)?;
    Some(rest[..end].to_string())
}

/// Resolve a possibly-relative href against the listing page URL.
fn resolve_href(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    match url::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
<article class="post">
  <h2><a href="/posts/1">First &amp; finest</a></h2>
  <time datetime="2024-01-01T00:00:00Z">Jan 1</time>
</article>
<article>
  <a href="https://other.example.com/2">Second</a>
</article>
</body></html>"#;

    fn adapter() -> HtmlAdapter {
        HtmlAdapter::new("scrape", "https://example.com/blog", HttpClient::new())
    }

    #[test]
    fn test_normalize_articles() {
        let items = adapter().normalize(PAGE).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, Some("First & finest".into()));
        assert_eq!(items[0].link, Some("https://example.com/posts/1".into()));
        assert_eq!(items[0].receive_date, 1704067200000);
        assert_eq!(items[1].link, Some("https://other.example.com/2".into()));
    }

    #[test]
    fn test_heading_fallback() {
        let html = r#"<div><h2><a href="/a">Alpha</a></h2><h2><a href="/b">Beta</a></h2></div>"#;
        let items = adapter().normalize(html).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].title, Some("Beta".into()));
    }

    #[test]
    fn test_no_structure_is_malformed() {
        let result = adapter().normalize("<html><body><p>nothing here</p></body></html>");
        assert!(matches!(result, Err(FetchError::MalformedResponse(_))));
    }

    #[test]
    fn test_strict_dates() {
        let html = r#"<article><a href="/x">No date</a></article>"#;
        let result = adapter().with_strict_dates(true).normalize(html);
        assert!(matches!(result, Err(FetchError::MalformedResponse(_))));
    }

    #[test]
    fn test_attr_value_quoting() {
        assert_eq!(
            attr_value(r#"<a href="/x" class=y"#, "href"),
            Some("/x".into())
        );
        assert_eq!(attr_value("<a href='/y'", "href"), Some("/y".into()));
        assert_eq!(attr_value("<a href=bare", "href"), None);
    }

    #[test]
    fn test_anchorless_block_skipped() {
        let html = r#"<article><p>plain</p></article><article><a href="/k">Keep</a></article>"#;
        let items = adapter().normalize(html).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, Some("Keep".into()));
    }
}
