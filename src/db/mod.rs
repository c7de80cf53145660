mod query;
mod repository;
mod schema;
mod search;
mod tags;

pub use query::{ListQuery, Page, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
pub use repository::{Repository, DEFAULT_BUSY_TIMEOUT};
pub use search::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};
