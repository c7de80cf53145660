use speedy_pocket::db::{ListQuery, Page};
use speedy_pocket::{ArticleUpdate, NewArticle, Repository, StoreError};
use tokio_test::{assert_err, assert_ok};

fn go_article() -> NewArticle {
    NewArticle {
        url: "https://a.example/1".into(),
        title: Some("Go Concurrency".into()),
        text_content: Some("goroutines and channels".into()),
        ..Default::default()
    }
}

fn numbered(i: usize) -> NewArticle {
    NewArticle {
        url: format!("https://n.example/{i}"),
        title: Some(format!("Article {i}")),
        text_content: Some(format!("body number{i} shared")),
        ..Default::default()
    }
}

#[tokio::test]
async fn saved_article_round_trip_and_search() {
    let repo = Repository::open_in_memory().await.unwrap();
    let id = repo.create_article(go_article()).await.unwrap();

    let article = repo.get_article(id).await.unwrap();
    assert!(article.tags.is_empty());
    assert!(!article.archived);
    assert!(article.read_at.is_none());

    let hits = repo.search("goroutines", 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].article.id, id);
    assert!(hits[0].snippet.contains("<mark>goroutines</mark>"));

    repo.delete_article(id).await.unwrap();
    assert!(repo.search("goroutines", 10).await.unwrap().is_empty());
    assert!(matches!(repo.get_article(id).await, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn duplicate_url_is_rejected() {
    let repo = Repository::open_in_memory().await.unwrap();
    assert_ok!(repo.create_article(go_article()).await);

    let mut again = go_article();
    again.title = Some("Overwrite attempt".into());
    let err = assert_err!(repo.create_article(again).await);
    assert!(matches!(err, StoreError::DuplicateUrl(_)));

    let all = repo.list(None, Page::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title.as_deref(), Some("Go Concurrency"));
    assert!(repo.search("overwrite", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleted_articles_never_match() {
    let repo = Repository::open_in_memory().await.unwrap();
    let mut ids = Vec::new();
    for i in 0..6 {
        ids.push(repo.create_article(numbered(i)).await.unwrap());
    }
    for (i, id) in ids.iter().enumerate().filter(|(i, _)| i % 2 == 0) {
        repo.delete_article(*id).await.unwrap();
        assert!(repo.search(&format!("number{i}"), 10).await.unwrap().is_empty());
    }

    let remaining: Vec<i64> = repo
        .search("shared", 50)
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.article.id)
        .collect();
    assert_eq!(remaining.len(), 3);
    assert!(remaining.iter().all(|id| !ids.iter().step_by(2).any(|d| d == id)));

    let report = repo.check_search_index().await.unwrap();
    assert_eq!(report.articles, 3);
    assert!(report.consistent);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let repo = Repository::open_in_memory().await.unwrap();
    let id = repo.create_article(go_article()).await.unwrap();
    assert_ok!(repo.delete_article(id).await);
    assert_ok!(repo.delete_article(id).await);
    assert_ok!(repo.delete_article(12345).await);
}

#[tokio::test]
async fn tagging_is_idempotent() {
    let repo = Repository::open_in_memory().await.unwrap();
    let id = repo.create_article(go_article()).await.unwrap();
    let tag = repo.create_tag("go").await.unwrap();

    repo.attach_tag(id, tag).await.unwrap();
    repo.attach_tag(id, tag).await.unwrap();
    assert_eq!(repo.get_article(id).await.unwrap().tags, vec!["go"]);

    let other = repo.create_tag("unused").await.unwrap();
    assert_ok!(repo.detach_tag(id, other).await);
    assert_eq!(repo.article_tags(id).await.unwrap(), vec!["go"]);

    repo.detach_tag(id, tag).await.unwrap();
    assert_ok!(repo.detach_tag(id, tag).await);
    assert!(repo.article_tags(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn pagination_is_deterministic() {
    let repo = Repository::open_in_memory().await.unwrap();
    let mut ids = Vec::new();
    for i in 0..4 {
        ids.push(repo.create_article(numbered(i)).await.unwrap());
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let first = repo.list(None, Page::new(2, 0)).await.unwrap();
    let second = repo.list(None, Page::new(2, 2)).await.unwrap();
    let seen: Vec<i64> = first.iter().chain(second.iter()).map(|a| a.id).collect();

    ids.reverse();
    assert_eq!(seen, ids);
    assert!(first[0].saved_at > first[1].saved_at);
    assert!(first[1].saved_at > second[0].saved_at);

    let past_end = repo.list(None, Page::new(2, 4)).await.unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn articles_by_tag_pages_newest_first() {
    let repo = Repository::open_in_memory().await.unwrap();
    let mut tagged = Vec::new();
    for i in 0..5 {
        let id = repo.create_article(numbered(i)).await.unwrap();
        if i != 2 {
            repo.tag_article(id, "keep").await.unwrap();
            tagged.push(id);
        }
    }
    tagged.reverse();

    let page_one = repo.articles_by_tag("keep", Page::new(3, 0)).await.unwrap();
    let page_two = repo.articles_by_tag("keep", Page::new(3, 3)).await.unwrap();
    let seen: Vec<i64> = page_one.iter().chain(&page_two).map(|a| a.id).collect();
    assert_eq!(seen, tagged);
    assert!(page_one.iter().all(|a| a.tags == vec!["keep"]));

    assert!(repo
        .articles_by_tag("nope", Page::default())
        .await
        .unwrap()
        .is_empty());

    // tag and archive filters combine
    repo.update_article(tagged[0], ArticleUpdate::archive(true))
        .await
        .unwrap();
    let unarchived = repo
        .list_articles(ListQuery::new().tagged("keep").archived(false))
        .await
        .unwrap();
    assert_eq!(unarchived.len(), 3);
}

#[tokio::test]
async fn mark_read_then_archive_keeps_read_at() {
    let repo = Repository::open_in_memory().await.unwrap();
    let id = repo.create_article(go_article()).await.unwrap();

    repo.update_article(id, ArticleUpdate::mark_read()).await.unwrap();
    let read_at = repo.get_article(id).await.unwrap().read_at;
    assert!(read_at.is_some());

    repo.update_article(id, ArticleUpdate::archive(true)).await.unwrap();
    let article = repo.get_article(id).await.unwrap();
    assert!(article.archived);
    assert_eq!(article.read_at, read_at);

    // both fields in one call
    let both = ArticleUpdate {
        archived: Some(false),
        mark_read: Some(true),
    };
    repo.update_article(id, both).await.unwrap();
    let article = repo.get_article(id).await.unwrap();
    assert!(!article.archived);
    assert!(article.read_at >= read_at);
}

#[tokio::test]
async fn reopening_an_initialized_store_is_safe() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pocket.db");

    let id = {
        let repo = Repository::new(&path).await.unwrap();
        let mut article = go_article();
        article.tags = vec!["go".into()];
        repo.create_article(article).await.unwrap()
    };

    let repo = Repository::new(&path).await.unwrap();
    let article = repo.get_article(id).await.unwrap();
    assert_eq!(article.tags, vec!["go"]);
    assert_eq!(repo.search("channels", 10).await.unwrap().len(), 1);
    assert!(repo.check_search_index().await.unwrap().consistent);
}

#[tokio::test]
async fn concurrent_writers_share_one_store() {
    let repo = Repository::open_in_memory().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            let id = repo.create_article(numbered(i)).await?;
            repo.tag_article(id, "batch").await?;
            repo.search("shared", 50).await?;
            Ok::<_, StoreError>(id)
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(repo.count_articles(None).await.unwrap(), 16);
    assert_eq!(repo.search("shared", 50).await.unwrap().len(), 16);
    assert_eq!(
        repo.articles_by_tag("batch", Page::new(100, 0))
            .await
            .unwrap()
            .len(),
        16
    );
}
