mod article;
mod search;
mod tag;

pub use article::{Article, ArticleUpdate, NewArticle};
pub use search::{IndexReport, SearchHit};
pub use tag::Tag;
