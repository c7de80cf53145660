/// Per-connection settings, applied before the schema.
pub const PRAGMAS: &str = r#"
PRAGMA foreign_keys = ON;
PRAGMA journal_mode = WAL;
"#;

pub const SCHEMA: &str = r#"
-- articles table
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE CHECK (url <> ''),
    title TEXT,
    content TEXT,
    text_content TEXT,
    excerpt TEXT,
    author TEXT,
    image_url TEXT,
    saved_at TEXT NOT NULL,
    read_at TEXT,
    archived INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_articles_saved_at ON articles(saved_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_articles_archived ON articles(archived, saved_at DESC);

-- tags table
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- article_tags table
CREATE TABLE IF NOT EXISTS article_tags (
    article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (article_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_article_tags_tag_id ON article_tags(tag_id);

-- full-text index over articles(title, text_content)
CREATE VIRTUAL TABLE IF NOT EXISTS articles_fts USING fts5(
    title,
    text_content,
    content = 'articles',
    content_rowid = 'id'
);

-- The triggers are the only path that writes articles_fts, so every write to
-- articles updates the index inside the same statement.
CREATE TRIGGER IF NOT EXISTS articles_ai AFTER INSERT ON articles BEGIN
    INSERT INTO articles_fts(rowid, title, text_content)
    VALUES (new.id, new.title, new.text_content);
END;

CREATE TRIGGER IF NOT EXISTS articles_ad AFTER DELETE ON articles BEGIN
    INSERT INTO articles_fts(articles_fts, rowid, title, text_content)
    VALUES ('delete', old.id, old.title, old.text_content);
END;

CREATE TRIGGER IF NOT EXISTS articles_au AFTER UPDATE OF title, text_content ON articles BEGIN
    INSERT INTO articles_fts(articles_fts, rowid, title, text_content)
    VALUES ('delete', old.id, old.title, old.text_content);
    INSERT INTO articles_fts(rowid, title, text_content)
    VALUES (new.id, new.title, new.text_content);
END;
"#;
