use rusqlite::ffi;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors returned by the article store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("an article with url {0} already exists")]
    DuplicateUrl(String),

    #[error("invalid search query: {0}")]
    InvalidQuery(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(#[from] tokio_rusqlite::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Classifies a failed article insert.
    pub(crate) fn from_insert(err: tokio_rusqlite::Error, url: &str) -> Self {
        match sqlite_failure(&err) {
            Some((e, msg))
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    && msg.is_some_and(|m| m.contains("articles.url")) =>
            {
                StoreError::DuplicateUrl(url.to_string())
            }
            _ => StoreError::Storage(err),
        }
    }

    /// A foreign key failure means the article (or tag) row is gone.
    pub(crate) fn from_attach(err: tokio_rusqlite::Error) -> Self {
        match sqlite_failure(&err) {
            Some((e, _)) if e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                StoreError::NotFound
            }
            _ => StoreError::Storage(err),
        }
    }

    /// The search statement is fixed, so a generic SQLITE_ERROR from it comes
    /// from the MATCH expression.
    pub(crate) fn from_search(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(e, msg) = &err {
            if e.code == ErrorCode::Unknown {
                let msg = msg.as_deref().unwrap_or("malformed query");
                return StoreError::InvalidQuery(msg.to_string());
            }
        }
        StoreError::Storage(err.into())
    }
}

fn sqlite_failure(err: &tokio_rusqlite::Error) -> Option<(&ffi::Error, Option<&str>)> {
    match err {
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, msg)) => {
            Some((e, msg.as_deref()))
        }
        _ => None,
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction failed: {0}")]
    Extract(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
