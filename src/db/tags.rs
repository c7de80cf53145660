use rusqlite::{params, Connection as SqliteConnection, OptionalExtension};

use crate::error::{StoreError, StoreResult};
use crate::models::{Article, Tag};

use super::query::{ListQuery, Page};
use super::repository::Repository;

// Tag writes are "ensure this state holds": creating an existing tag,
// attaching a present link or detaching an absent one all succeed quietly.

pub(crate) fn validate_tag_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidInput("tag name must not be empty".into()));
    }
    Ok(())
}

pub(crate) fn ensure_tag(conn: &SqliteConnection, name: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        params![name],
    )?;
    conn.query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| {
        row.get(0)
    })
}

pub(crate) fn attach(conn: &SqliteConnection, article_id: i64, tag_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?1, ?2)",
        params![article_id, tag_id],
    )?;
    Ok(())
}

pub(crate) fn tags_for(conn: &SqliteConnection, article_id: i64) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        r#"SELECT t.name FROM tags t
           JOIN article_tags at ON at.tag_id = t.id
           WHERE at.article_id = ?1
           ORDER BY t.name"#,
    )?;
    let names = stmt
        .query_map(params![article_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(names)
}

fn find_tag_id(conn: &SqliteConnection, name: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| {
        row.get(0)
    })
    .optional()
}

impl Repository {
    // Tag operations

    /// Returns the id of the tag called `name`, creating it if needed.
    pub async fn create_tag(&self, name: &str) -> StoreResult<i64> {
        validate_tag_name(name)?;
        let name = name.to_string();
        let id = self
            .conn
            .call(move |conn| Ok(ensure_tag(conn, &name)?))
            .await?;
        Ok(id)
    }

    /// All tags, ordered by name.
    pub async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let tags = self
            .reader
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name")?;
                let tags = stmt
                    .query_map([], |row| {
                        Ok(Tag {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(tags)
            })
            .await?;
        Ok(tags)
    }

    pub async fn find_tag(&self, name: &str) -> StoreResult<Tag> {
        let name = name.to_string();
        let tag = self
            .reader
            .call(move |conn| {
                let id = find_tag_id(conn, &name)?;
                Ok(id.map(|id| Tag { id, name }))
            })
            .await?;
        tag.ok_or(StoreError::NotFound)
    }

    /// Links an article and a tag. `NotFound` if either row is missing.
    pub async fn attach_tag(&self, article_id: i64, tag_id: i64) -> StoreResult<()> {
        self.conn
            .call(move |conn| Ok(attach(conn, article_id, tag_id)?))
            .await
            .map_err(StoreError::from_attach)?;
        tracing::debug!(article_id, tag_id, "attached tag");
        Ok(())
    }

    pub async fn detach_tag(&self, article_id: i64, tag_id: i64) -> StoreResult<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM article_tags WHERE article_id = ?1 AND tag_id = ?2",
                    params![article_id, tag_id],
                )?;
                Ok(())
            })
            .await?;
        tracing::debug!(article_id, tag_id, "detached tag");
        Ok(())
    }

    /// Ensures the tag exists and is attached, in one transaction.
    pub async fn tag_article(&self, article_id: i64, name: &str) -> StoreResult<i64> {
        validate_tag_name(name)?;
        let name = name.to_string();
        let tag_id = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let tag_id = ensure_tag(&tx, &name)?;
                attach(&tx, article_id, tag_id)?;
                tx.commit()?;
                Ok(tag_id)
            })
            .await
            .map_err(StoreError::from_attach)?;
        Ok(tag_id)
    }

    /// Detaches the named tag. An unknown tag name is `NotFound`; a known tag
    /// that is not attached is a no-op.
    pub async fn untag_article(&self, article_id: i64, name: &str) -> StoreResult<()> {
        let name = name.to_string();
        let found = self
            .conn
            .call(move |conn| {
                let Some(tag_id) = find_tag_id(conn, &name)? else {
                    return Ok(false);
                };
                conn.execute(
                    "DELETE FROM article_tags WHERE article_id = ?1 AND tag_id = ?2",
                    params![article_id, tag_id],
                )?;
                Ok(true)
            })
            .await?;
        if found {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    pub async fn article_tags(&self, article_id: i64) -> StoreResult<Vec<String>> {
        let tags = self
            .reader
            .call(move |conn| Ok(tags_for(conn, article_id)?))
            .await?;
        Ok(tags)
    }

    /// Articles carrying `name`, ordered and paged like `list`. An unknown
    /// tag yields an empty page.
    pub async fn articles_by_tag(&self, name: &str, page: Page) -> StoreResult<Vec<Article>> {
        self.list_articles(ListQuery::new().tagged(name).page(page))
            .await
    }
}
