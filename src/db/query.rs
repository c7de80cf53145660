use rusqlite::types::Value;

/// Hard cap on a single page of articles.
pub const MAX_LIST_LIMIT: u32 = 100;
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Columns of the summary projection, in the order `summary_from_row` reads them.
pub(crate) const SUMMARY_COLUMNS: &str =
    "a.id, a.url, a.title, a.excerpt, a.author, a.image_url, a.saved_at, a.read_at, a.archived";

/// Summary columns followed by the article bodies.
pub(crate) const FULL_COLUMNS: &str = "a.id, a.url, a.title, a.excerpt, a.author, a.image_url, \
     a.saved_at, a.read_at, a.archived, a.content, a.text_content";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// A zero limit falls back to the default; anything above `max` is cut to `max`.
    pub fn clamped(self, max: u32) -> Self {
        let limit = match self.limit {
            0 => DEFAULT_LIST_LIMIT.min(max),
            n => n.min(max),
        };
        Self {
            limit: limit.max(1),
            offset: self.offset,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(DEFAULT_LIST_LIMIT, 0)
    }
}

/// Filters for listing articles newest-first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub archived: Option<bool>,
    pub tag: Option<String>,
    pub page: Page,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    pub fn tagged(mut self, name: impl Into<String>) -> Self {
        self.tag = Some(name.into());
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    fn from_where(&self, values: &mut Vec<Value>) -> String {
        let mut sql = String::from(" FROM articles a");
        if let Some(tag) = &self.tag {
            sql.push_str(
                " JOIN article_tags at ON at.article_id = a.id \
                 JOIN tags t ON t.id = at.tag_id AND t.name = ?",
            );
            values.push(Value::Text(tag.clone()));
        }
        if let Some(archived) = self.archived {
            sql.push_str(" WHERE a.archived = ?");
            values.push(Value::Integer(archived as i64));
        }
        sql
    }

    /// Builds the page query. The `id` tiebreak keeps pages stable when two
    /// articles share a `saved_at`.
    pub(crate) fn to_sql(&self) -> (String, Vec<Value>) {
        let mut values = Vec::new();
        let page = self.page.clamped(MAX_LIST_LIMIT);
        let mut sql = format!("SELECT {}", SUMMARY_COLUMNS);
        sql.push_str(&self.from_where(&mut values));
        sql.push_str(" ORDER BY a.saved_at DESC, a.id DESC LIMIT ? OFFSET ?");
        values.push(Value::Integer(page.limit as i64));
        values.push(Value::Integer(page.offset as i64));
        (sql, values)
    }

    /// Same filters as `to_sql`, without pagination.
    pub(crate) fn to_count_sql(&self) -> (String, Vec<Value>) {
        let mut values = Vec::new();
        let mut sql = String::from("SELECT COUNT(*)");
        sql.push_str(&self.from_where(&mut values));
        (sql, values)
    }
}
