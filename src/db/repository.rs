use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{
    params, params_from_iter, Connection as SqliteConnection, OpenFlags, OptionalExtension, Row,
};
use tokio_rusqlite::Connection;

use crate::error::{StoreError, StoreResult};
use crate::models::{Article, ArticleUpdate, NewArticle};

use super::query::{ListQuery, Page, FULL_COLUMNS};
use super::schema::{PRAGMAS, SCHEMA};
use super::tags::{attach, ensure_tag, tags_for, validate_tag_name};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const IN_MEMORY: &str = ":memory:";

/// The article store. Cloning is cheap; every clone talks to the same
/// connection threads, and each public method runs as one call on one of them.
///
/// Writes go through `conn`. Plain reads go through `reader`, a second
/// read-only connection on file-backed stores, so a long list or search
/// never sits in front of a write. In-memory stores share one connection.
#[derive(Clone)]
pub struct Repository {
    pub(crate) conn: Connection,
    pub(crate) reader: Connection,
}

impl Repository {
    pub async fn new(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open(db_path, DEFAULT_BUSY_TIMEOUT).await
    }

    /// Opens (creating if needed) the store at `db_path`. Running this against
    /// an initialized store is a no-op apart from the pragmas.
    pub async fn open(db_path: impl AsRef<Path>, busy_timeout: Duration) -> StoreResult<Self> {
        let path = db_path.as_ref();
        let conn = Connection::open(path).await?;

        conn.call(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch(PRAGMAS)?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        let reader = if path == Path::new(IN_MEMORY) {
            conn.clone()
        } else {
            // WAL mode is already set on the file, so this reader works off
            // snapshots and never takes the write lock.
            let reader = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX
                    | OpenFlags::SQLITE_OPEN_URI,
            )
            .await?;
            reader
                .call(move |conn| {
                    conn.busy_timeout(busy_timeout)?;
                    Ok(())
                })
                .await?;
            reader
        };

        tracing::debug!(path = %path.display(), "article store ready");
        Ok(Self { conn, reader })
    }

    pub async fn open_in_memory() -> StoreResult<Self> {
        Self::new(IN_MEMORY).await
    }

    // Article operations

    /// Inserts the article with any initial tags. Fails with
    /// `DuplicateUrl` without writing anything if the url is taken.
    pub async fn create_article(&self, article: NewArticle) -> StoreResult<i64> {
        if article.url.trim().is_empty() {
            return Err(StoreError::InvalidInput("url must not be empty".into()));
        }
        for name in &article.tags {
            validate_tag_name(name)?;
        }

        let url = article.url.clone();
        let saved_at = format_timestamp(Utc::now());
        let id = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    r#"INSERT INTO articles (url, title, content, text_content, excerpt, author, image_url, saved_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
                    params![
                        article.url,
                        article.title,
                        article.content,
                        article.text_content,
                        article.excerpt,
                        article.author,
                        article.image_url,
                        saved_at,
                    ],
                )?;
                let id = tx.last_insert_rowid();
                for name in &article.tags {
                    let tag_id = ensure_tag(&tx, name)?;
                    attach(&tx, id, tag_id)?;
                }
                tx.commit()?;
                Ok(id)
            })
            .await
            .map_err(|e| StoreError::from_insert(e, &url))?;

        tracing::debug!(id, url = %url, "created article");
        Ok(id)
    }

    /// Full article, bodies and tags included.
    pub async fn get_article(&self, id: i64) -> StoreResult<Article> {
        let sql = format!("SELECT {} FROM articles a WHERE a.id = ?1", FULL_COLUMNS);
        self.fetch_one(sql, rusqlite::types::Value::Integer(id)).await
    }

    pub async fn get_article_by_url(&self, url: &str) -> StoreResult<Article> {
        let sql = format!("SELECT {} FROM articles a WHERE a.url = ?1", FULL_COLUMNS);
        self.fetch_one(sql, rusqlite::types::Value::Text(url.to_string()))
            .await
    }

    async fn fetch_one(&self, sql: String, key: rusqlite::types::Value) -> StoreResult<Article> {
        let article = self
            .reader
            .call(move |conn| {
                let tx = conn.transaction()?;
                let article = tx
                    .query_row(&sql, [key], article_from_row)
                    .optional()?;
                let article = match article {
                    Some(mut article) => {
                        article.tags = tags_for(&tx, article.id)?;
                        Some(article)
                    }
                    None => None,
                };
                Ok(article)
            })
            .await?;
        article.ok_or(StoreError::NotFound)
    }

    /// Newest first, summary projection.
    pub async fn list_articles(&self, query: ListQuery) -> StoreResult<Vec<Article>> {
        let (sql, values) = query.to_sql();
        let articles = self
            .reader
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut articles = {
                    let mut stmt = tx.prepare(&sql)?;
                    let rows = stmt
                        .query_map(params_from_iter(values.iter()), summary_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                };
                load_tags(&tx, &mut articles)?;
                Ok(articles)
            })
            .await?;
        tracing::debug!(count = articles.len(), ?query, "listed articles");
        Ok(articles)
    }

    pub async fn list(&self, archived: Option<bool>, page: Page) -> StoreResult<Vec<Article>> {
        self.list_articles(ListQuery {
            archived,
            tag: None,
            page,
        })
        .await
    }

    pub async fn count_articles(&self, archived: Option<bool>) -> StoreResult<i64> {
        let query = ListQuery {
            archived,
            ..Default::default()
        };
        let (sql, values) = query.to_count_sql();
        let count = self
            .reader
            .call(move |conn| {
                let count =
                    conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    /// Applies whichever fields are set. `mark_read` stamps `read_at` with the
    /// current time on every call.
    pub async fn update_article(&self, id: i64, update: ArticleUpdate) -> StoreResult<()> {
        if update.is_noop() {
            return Ok(());
        }

        let read_at = (update.mark_read == Some(true)).then(|| format_timestamp(Utc::now()));
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    r#"UPDATE articles SET
                           archived = COALESCE(?1, archived),
                           read_at = COALESCE(?2, read_at)
                       WHERE id = ?3"#,
                    params![update.archived, read_at, id],
                )?;
                Ok(changed)
            })
            .await?;

        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::debug!(id, ?update, "updated article");
        Ok(())
    }

    /// Removes the article. Tag links go by cascade and the index entry by the
    /// `articles_ad` trigger, all inside this one statement. Deleting a
    /// missing id succeeds.
    pub async fn delete_article(&self, id: i64) -> StoreResult<()> {
        let removed = self
            .conn
            .call(move |conn| {
                let removed = conn.execute("DELETE FROM articles WHERE id = ?1", params![id])?;
                Ok(removed)
            })
            .await?;
        tracing::debug!(id, removed, "deleted article");
        Ok(())
    }
}

pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56.123456Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(s) => parse_datetime(&s).map(Some).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                Type::Text,
                format!("invalid timestamp {:?}", s).into(),
            )
        }),
        None => Ok(None),
    }
}

/// Maps the `SUMMARY_COLUMNS` projection.
pub(crate) fn summary_from_row(row: &Row) -> rusqlite::Result<Article> {
    let saved_at = timestamp_column(row, 6)?.ok_or(rusqlite::Error::InvalidColumnType(
        6,
        "saved_at".into(),
        Type::Null,
    ))?;
    Ok(Article {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        content: None,
        text_content: None,
        excerpt: row.get(3)?,
        author: row.get(4)?,
        image_url: row.get(5)?,
        saved_at,
        read_at: timestamp_column(row, 7)?,
        archived: row.get(8)?,
        tags: Vec::new(),
    })
}

/// Maps the `FULL_COLUMNS` projection.
fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    let mut article = summary_from_row(row)?;
    article.content = row.get(9)?;
    article.text_content = row.get(10)?;
    Ok(article)
}

pub(crate) fn load_tags(conn: &SqliteConnection, articles: &mut [Article]) -> rusqlite::Result<()> {
    for article in articles.iter_mut() {
        article.tags = tags_for(conn, article.id)?;
    }
    Ok(())
}
