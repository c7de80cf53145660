use crate::config::Config;
use crate::db::{ListQuery, Page, Repository};
use crate::error::Result;
use crate::models::{Article, SearchHit};
use crate::services::{Extractor, HtmlExtractor};

/// Wires the extractor to the store and applies the configured limits.
pub struct App<E = HtmlExtractor> {
    pub repository: Repository,
    extractor: E,
    config: Config,
}

impl App<HtmlExtractor> {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::open(&config.db_path, config.busy_timeout()).await?;
        let extractor = HtmlExtractor::new(config.fetch_timeout())?;
        Ok(Self::with_extractor(repository, extractor, config.clone()))
    }
}

impl<E: Extractor> App<E> {
    pub fn with_extractor(repository: Repository, extractor: E, config: Config) -> Self {
        Self {
            repository,
            extractor,
            config,
        }
    }

    /// Fetches `url`, stores the result with `tags` plus the configured
    /// default tags, and returns the stored article.
    pub async fn save_url(&self, url: &str, tags: &[String]) -> Result<Article> {
        let extracted = self.extractor.extract(url).await?;

        let mut all_tags: Vec<String> = self
            .config
            .default_tags
            .iter()
            .chain(tags)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        all_tags.sort();
        all_tags.dedup();

        let id = self
            .repository
            .create_article(extracted.into_new_article(all_tags))
            .await?;
        tracing::info!(id, url, "saved article");
        Ok(self.repository.get_article(id).await?)
    }

    pub async fn list(
        &self,
        archived: Option<bool>,
        tag: Option<String>,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<Vec<Article>> {
        let limit = limit.unwrap_or(self.config.default_list_limit);
        let query = ListQuery {
            archived,
            tag,
            page: Page::new(limit, offset).clamped(self.config.max_list_limit),
        };
        Ok(self.repository.list_articles(query).await?)
    }

    pub async fn search(&self, query: &str, limit: Option<u32>) -> Result<Vec<SearchHit>> {
        let limit = limit
            .unwrap_or(self.config.default_search_limit)
            .clamp(1, self.config.max_search_limit);
        Ok(self.repository.search(query, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, StoreError};
    use crate::services::Extracted;
    use async_trait::async_trait;

    struct StaticExtractor;

    #[async_trait]
    impl Extractor for StaticExtractor {
        async fn extract(&self, url: &str) -> Result<Extracted> {
            if url.contains("broken") {
                return Err(AppError::Extract("HTTP 500".into()));
            }
            Ok(Extracted {
                url: url.to_string(),
                title: Some("Go Concurrency".into()),
                text_content: Some("goroutines and channels".into()),
                ..Default::default()
            })
        }
    }

    async fn app() -> App<StaticExtractor> {
        let repository = Repository::open_in_memory().await.unwrap();
        let config = Config {
            db_path: ":memory:".into(),
            default_tags: vec!["inbox".into()],
            max_list_limit: 2,
            ..Config::default()
        };
        App::with_extractor(repository, StaticExtractor, config)
    }

    #[tokio::test]
    async fn test_save_url_merges_default_tags() {
        let app = app().await;
        let article = app
            .save_url("https://a.example/1", &["go".into(), "inbox".into(), " ".into()])
            .await
            .unwrap();
        assert_eq!(article.tags, vec!["go", "inbox"]);
        assert_eq!(article.title.as_deref(), Some("Go Concurrency"));

        let hits = app.search("goroutines", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].article.tags, vec!["go", "inbox"]);
    }

    #[tokio::test]
    async fn test_save_url_surfaces_errors() {
        let app = app().await;
        assert!(matches!(
            app.save_url("https://broken.example", &[]).await,
            Err(AppError::Extract(_))
        ));

        app.save_url("https://a.example/1", &[]).await.unwrap();
        assert!(matches!(
            app.save_url("https://a.example/1", &[]).await,
            Err(AppError::Store(StoreError::DuplicateUrl(_)))
        ));
    }

    #[tokio::test]
    async fn test_list_applies_configured_cap() {
        let app = app().await;
        for i in 0..3 {
            app.save_url(&format!("https://a.example/{i}"), &[]).await.unwrap();
        }
        assert_eq!(app.list(None, None, Some(10), 0).await.unwrap().len(), 2);
        assert_eq!(
            app.list(None, Some("inbox".into()), None, 2).await.unwrap().len(),
            1
        );
    }
}
