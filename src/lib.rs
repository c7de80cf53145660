//! A read-it-later article store.
//!
//! Articles live in SQLite next to an FTS5 index over their title and text.
//! Triggers on the `articles` table keep the index in step with every insert,
//! update and delete, so no write path can leave it stale.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use app::App;
pub use config::Config;
pub use db::{ListQuery, Page, Repository};
pub use error::{AppError, Result, StoreError, StoreResult};
pub use models::{Article, ArticleUpdate, IndexReport, NewArticle, SearchHit, Tag};
