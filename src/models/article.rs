use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved article.
///
/// Listings and search results carry a summary projection: `content` and
/// `text_content` are `None` there and only populated by a single-article
/// lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub saved_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub archived: bool,
    /// Sorted by name.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Article {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.url)
    }
}

/// Everything the caller supplies when saving an article. `id` and
/// `saved_at` are assigned by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewArticle {
    pub url: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub text_content: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    /// Tags attached in the same transaction as the insert.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewArticle {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Lifecycle changes accepted by `Repository::update_article`. Unset fields
/// are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleUpdate {
    pub archived: Option<bool>,
    pub mark_read: Option<bool>,
}

impl ArticleUpdate {
    pub fn archive(archived: bool) -> Self {
        Self {
            archived: Some(archived),
            ..Default::default()
        }
    }

    pub fn mark_read() -> Self {
        Self {
            mark_read: Some(true),
            ..Default::default()
        }
    }

    /// `mark_read: Some(false)` is accepted but writes nothing; read state is
    /// never cleared.
    pub fn is_noop(&self) -> bool {
        self.archived.is_none() && self.mark_read != Some(true)
    }
}
