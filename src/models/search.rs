use serde::{Deserialize, Serialize};

use super::Article;

/// One full-text match: the article summary plus a highlighted excerpt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub article: Article,
    /// Match spans are wrapped in `<mark>`/`</mark>`; `...` marks a cut.
    pub snippet: String,
    /// Negated bm25 rank, higher is more relevant.
    pub relevance: f64,
}

/// Result of comparing the full-text index against the articles table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub articles: i64,
    pub indexed: i64,
    pub consistent: bool,
}
