use rusqlite::{params, Connection as SqliteConnection, ErrorCode};

use crate::error::{StoreError, StoreResult};
use crate::models::{IndexReport, SearchHit};

use super::repository::{summary_from_row, Repository};
use super::tags::tags_for;

/// Hard cap on search results.
pub const MAX_SEARCH_LIMIT: u32 = 50;
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

// Column -1 lets FTS5 pick whichever of title/text_content matched best, and
// the snippet window is 32 tokens.
// Rank is bm25; ties fall back to recency, then id, so a fixed corpus and
// query always produce the same order.
const SEARCH_SQL: &str = r#"
SELECT a.id, a.url, a.title, a.excerpt, a.author, a.image_url, a.saved_at, a.read_at, a.archived,
       snippet(articles_fts, -1, '<mark>', '</mark>', '...', 32) AS snippet,
       articles_fts.rank AS rank
FROM articles_fts
JOIN articles a ON a.id = articles_fts.rowid
WHERE articles_fts MATCH ?1
ORDER BY rank, a.saved_at DESC, a.id DESC
LIMIT ?2
"#;

/// Catches unbalanced quotes and parentheses before the query reaches FTS5.
/// Anything subtler is left to the FTS5 parser.
fn validate_query(query: &str) -> StoreResult<()> {
    let mut depth = 0usize;
    let mut in_phrase = false;

    for c in query.chars() {
        match c {
            '"' => in_phrase = !in_phrase,
            '(' if !in_phrase => depth += 1,
            ')' if !in_phrase => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| StoreError::InvalidQuery("unexpected ')'".into()))?;
            }
            _ => {}
        }
    }

    if in_phrase {
        return Err(StoreError::InvalidQuery("unterminated phrase".into()));
    }
    if depth != 0 {
        return Err(StoreError::InvalidQuery("unbalanced parentheses".into()));
    }
    Ok(())
}

/// Runs the MATCH statement alone, so its errors can be told apart from
/// failures while loading tags.
fn matching_rows(conn: &SqliteConnection, query: &str, limit: u32) -> rusqlite::Result<Vec<SearchHit>> {
    let mut stmt = conn.prepare(SEARCH_SQL)?;
    let hits = stmt
        .query_map(params![query, limit], |row| {
            let rank: f64 = row.get(10)?;
            Ok(SearchHit {
                article: summary_from_row(row)?,
                snippet: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
                relevance: -rank,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(hits)
}

impl Repository {
    // Search operations

    /// Full-text search over title and text. Whitespace-separated terms must
    /// all match. An empty query matches nothing.
    pub async fn search(&self, query: &str, limit: u32) -> StoreResult<Vec<SearchHit>> {
        let query = query.trim().to_string();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        validate_query(&query)?;

        let limit = match limit {
            0 => DEFAULT_SEARCH_LIMIT,
            n => n.min(MAX_SEARCH_LIMIT),
        };

        tracing::debug!(query = %query, limit, "searching articles");
        let hits = self
            .reader
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut hits = match matching_rows(&tx, &query, limit) {
                    Ok(hits) => hits,
                    Err(e) => return Ok(Err(e)),
                };
                for hit in hits.iter_mut() {
                    hit.article.tags = tags_for(&tx, hit.article.id)?;
                }
                Ok(Ok(hits))
            })
            .await?
            .map_err(StoreError::from_search)?;

        tracing::debug!(count = hits.len(), "search finished");
        Ok(hits)
    }

    /// Compares the index with the articles table using FTS5's own
    /// integrity check plus a row count.
    pub async fn check_search_index(&self) -> StoreResult<IndexReport> {
        let report = self
            .conn
            .call(|conn| {
                let integrity_ok = match conn.execute(
                    "INSERT INTO articles_fts(articles_fts, rank) VALUES ('integrity-check', 1)",
                    [],
                ) {
                    Ok(_) => true,
                    Err(rusqlite::Error::SqliteFailure(e, _))
                        if e.code == ErrorCode::DatabaseCorrupt =>
                    {
                        false
                    }
                    Err(e) => return Err(e.into()),
                };
                let articles: i64 =
                    conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
                let indexed: i64 =
                    conn.query_row("SELECT COUNT(*) FROM articles_fts_docsize", [], |row| {
                        row.get(0)
                    })?;
                Ok(IndexReport {
                    articles,
                    indexed,
                    consistent: integrity_ok && articles == indexed,
                })
            })
            .await?;
        Ok(report)
    }

    /// Rebuilds the whole index from the articles table.
    pub async fn rebuild_search_index(&self) -> StoreResult<()> {
        self.conn
            .call(|conn| {
                conn.execute("INSERT INTO articles_fts(articles_fts) VALUES ('rebuild')", [])?;
                Ok(())
            })
            .await?;
        tracing::debug!("rebuilt search index");
        Ok(())
    }
}
