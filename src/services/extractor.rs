use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::NewArticle;

const USER_AGENT_STRING: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
const EXCERPT_CHARS: usize = 200;
const TEXT_WIDTH: usize = 80;

/// What the extractor pulls out of a page. Every field but `url` may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub url: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub text_content: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
}

impl Extracted {
    pub fn into_new_article(self, tags: Vec<String>) -> NewArticle {
        NewArticle {
            url: self.url,
            title: self.title,
            content: self.content,
            text_content: self.text_content,
            excerpt: self.excerpt,
            author: self.author,
            image_url: self.image_url,
            tags,
        }
    }
}

/// Turns a URL into article fields.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<Extracted>;
}

pub struct HtmlExtractor {
    client: Client,
}

impl HtmlExtractor {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Extractor for HtmlExtractor {
    async fn extract(&self, url: &str) -> Result<Extracted> {
        let url = normalize_url(url)?;

        let response = self.client.get(url.as_str()).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Extract(format!(
                "HTTP {} fetching {}",
                response.status(),
                url
            )));
        }

        let html = response.text().await?;
        tracing::debug!("Fetched {} bytes from {}", html.len(), url);
        Ok(parse_document(&html, &url))
    }
}

/// Parses the URL, defaulting to https when no scheme was given.
pub fn normalize_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::Extract("URL is required".into()));
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        Ok(url) => Err(AppError::Extract(format!(
            "unsupported scheme {:?}",
            url.scheme()
        ))),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Url::parse(&format!("https://{}", raw))?),
        Err(e) => Err(e.into()),
    }
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<title[^>]*>(.*?)</title>")
}

fn meta_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<meta\s[^>]*>")
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r#"(?is)\b(name|property|content)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
}

fn article_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<article[^>]*>(.*?)</article>")
}

fn body_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?is)<body[^>]*>(.*?)</body>")
}

fn noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>|<noscript[^>]*>.*?</noscript>|<!--.*?-->",
    )
}

/// `<meta>` tags keyed by lowercased `name`/`property`.
fn meta_tags(html: &str) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    for tag in meta_re().find_iter(html) {
        let mut key = None;
        let mut content = None;
        for cap in attr_re().captures_iter(tag.as_str()) {
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .map(|m| m.as_str().to_string());
            match cap[1].to_ascii_lowercase().as_str() {
                "content" => content = value,
                _ => key = value.map(|v| v.to_ascii_lowercase()),
            }
        }
        if let (Some(key), Some(content)) = (key, content) {
            tags.entry(key).or_insert_with(|| decode_entities(content.trim()));
        }
    }
    tags
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

/// Resolve a potentially relative URL against the page URL
fn resolve_url(href: &str, base: &Url) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Collapses html2text output: trimmed lines, no blank ones.
fn clean_text(text: &str) -> String {
    text.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn make_excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > EXCERPT_CHARS {
        let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut.trim_end())
    } else {
        flat
    }
}

/// Extract readable content from a fetched page.
pub fn parse_document(html: &str, url: &Url) -> Extracted {
    let meta = meta_tags(html);
    let lookup = |keys: &[&str]| keys.iter().find_map(|k| non_empty(meta.get(*k).cloned()));

    let title = lookup(&["og:title", "twitter:title"]).or_else(|| {
        non_empty(
            title_re()
                .captures(html)
                .map(|cap| decode_entities(cap[1].trim())),
        )
    });

    // Prefer <article>, fall back to the whole <body>
    let content = article_re()
        .captures(html)
        .or_else(|| body_re().captures(html))
        .and_then(|cap| cap.get(1))
        .map(|m| noise_re().replace_all(m.as_str(), "").trim().to_string());
    let content = non_empty(content);

    let text_content = content.as_deref().and_then(|html| {
        match html2text::from_read(html.as_bytes(), TEXT_WIDTH) {
            Ok(text) => non_empty(Some(clean_text(&text))),
            Err(e) => {
                tracing::debug!("Failed to convert HTML to text: {}", e);
                None
            }
        }
    });

    let excerpt = lookup(&["description", "og:description", "twitter:description"])
        .or_else(|| text_content.as_deref().map(make_excerpt));

    Extracted {
        url: url.to_string(),
        title,
        content,
        text_content,
        excerpt,
        author: lookup(&["author", "article:author"]),
        image_url: lookup(&["og:image", "twitter:image"]).map(|src| resolve_url(&src, url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Fallback &amp; Title</title>
  <meta property="og:title" content="Go Concurrency">
  <meta name="author" content="Rob">
  <meta property='og:image' content='/img/gopher.png'>
  <script>var tracking = "goroutines";</script>
</head>
<body>
  <nav>Home</nav>
  <article>
    <h1>Go Concurrency</h1>
    <p>Goroutines and channels.</p>
    <style>.x { color: red }</style>
    <p>Select statements.</p>
  </article>
</body>
</html>"#;

    fn base() -> Url {
        Url::parse("https://blog.example/posts/go").unwrap()
    }

    #[test]
    fn test_parse_document_extracts_metadata() {
        let doc = parse_document(PAGE, &base());
        assert_eq!(doc.url, "https://blog.example/posts/go");
        assert_eq!(doc.title.as_deref(), Some("Go Concurrency"));
        assert_eq!(doc.author.as_deref(), Some("Rob"));
        assert_eq!(
            doc.image_url.as_deref(),
            Some("https://blog.example/img/gopher.png")
        );
    }

    #[test]
    fn test_parse_document_prefers_article_body() {
        let doc = parse_document(PAGE, &base());
        let content = doc.content.unwrap();
        assert!(content.contains("Goroutines and channels."));
        assert!(!content.contains("Home"));
        assert!(!content.contains("color: red"));

        let text = doc.text_content.unwrap();
        assert!(text.contains("Goroutines and channels."));
        assert!(text.contains("Select statements."));
        assert!(!text.lines().any(|l| l.trim().is_empty()));

        // no description meta, so the excerpt comes from the text
        let excerpt = doc.excerpt.unwrap();
        assert!(excerpt.contains("Goroutines and channels."));
    }

    #[test]
    fn test_title_tag_fallback_and_empty_page() {
        let doc = parse_document("<html><head><title>Fallback &amp; Title</title></head></html>", &base());
        assert_eq!(doc.title.as_deref(), Some("Fallback & Title"));
        assert_eq!(doc.content, None);
        assert_eq!(doc.text_content, None);
        assert_eq!(doc.excerpt, None);

        let empty = parse_document("", &base());
        assert_eq!(empty.title, None);
        assert_eq!(empty.url, "https://blog.example/posts/go");
    }

    #[test]
    fn test_description_meta_wins_over_text() {
        let html = r#"<meta name="description" content="Short summary"><body><p>Body text</p></body>"#;
        let doc = parse_document(html, &base());
        assert_eq!(doc.excerpt.as_deref(), Some("Short summary"));
    }

    #[test]
    fn test_excerpt_is_cut_at_char_boundary() {
        let text = "é".repeat(300);
        let excerpt = make_excerpt(&text);
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.chars().count(), EXCERPT_CHARS + 3);
        assert_eq!(make_excerpt("short  text\nhere"), "short text here");
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("example.com/a").unwrap().as_str(),
            "https://example.com/a"
        );
        assert_eq!(
            normalize_url(" http://example.com ").unwrap().as_str(),
            "http://example.com/"
        );
        assert!(matches!(normalize_url(""), Err(AppError::Extract(_))));
        assert!(matches!(
            normalize_url("ftp://example.com"),
            Err(AppError::Extract(_))
        ));
    }
}
