use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use speedy_pocket::error::Result;
use speedy_pocket::models::{Article, ArticleUpdate, SearchHit};
use speedy_pocket::{App, Config};

#[derive(Parser)]
#[command(name = "pocket", version, about = "Save articles to read later and search them")]
struct Cli {
    /// Database file, overriding `db_path` from the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a URL and save it
    Save {
        url: String,
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Show one article in full
    Get { id: i64 },
    /// List saved articles, newest first
    List {
        #[arg(long, conflicts_with = "unarchived")]
        archived: bool,
        #[arg(long)]
        unarchived: bool,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Mark an article as read
    Read { id: i64 },
    Archive { id: i64 },
    Unarchive { id: i64 },
    Delete { id: i64 },
    /// Full-text search over titles and text
    Search {
        query: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// List all tags
    Tags,
    /// Add a tag to an article
    Tag { id: i64, name: String },
    /// Remove a tag from an article
    Untag { id: i64, name: String },
    /// Compare the search index with the stored articles
    CheckIndex,
    /// Rebuild the search index from the stored articles
    RebuildIndex,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load()?;
    if let Some(db) = &cli.db {
        config.db_path = db.to_string_lossy().to_string();
    }

    let app = App::new(&config).await?;
    let repo = &app.repository;
    let json = cli.json;

    match cli.command {
        Commands::Save { url, tags } => {
            let article = app.save_url(&url, &tags).await?;
            print_article(&article, json)?;
        }
        Commands::Get { id } => {
            let article = repo.get_article(id).await?;
            print_article(&article, json)?;
        }
        Commands::List {
            archived,
            unarchived,
            tag,
            limit,
            offset,
        } => {
            let filter = match (archived, unarchived) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let articles = app.list(filter, tag, limit, offset).await?;
            print_list(&articles, json)?;
        }
        Commands::Read { id } => repo.update_article(id, ArticleUpdate::mark_read()).await?,
        Commands::Archive { id } => repo.update_article(id, ArticleUpdate::archive(true)).await?,
        Commands::Unarchive { id } => {
            repo.update_article(id, ArticleUpdate::archive(false)).await?
        }
        Commands::Delete { id } => repo.delete_article(id).await?,
        Commands::Search { query, limit } => {
            let hits = app.search(&query, limit).await?;
            print_hits(&hits, json)?;
        }
        Commands::Tags => {
            let tags = repo.list_tags().await?;
            if json {
                print_json(&tags)?;
            } else {
                for tag in tags {
                    println!("{}", tag.name);
                }
            }
        }
        Commands::Tag { id, name } => {
            repo.tag_article(id, &name).await?;
        }
        Commands::Untag { id, name } => repo.untag_article(id, &name).await?,
        Commands::CheckIndex => {
            let report = repo.check_search_index().await?;
            if json {
                print_json(&report)?;
            } else {
                println!(
                    "{} articles, {} indexed, {}",
                    report.articles,
                    report.indexed,
                    if report.consistent { "consistent" } else { "INCONSISTENT" }
                );
            }
        }
        Commands::RebuildIndex => {
            repo.rebuild_search_index().await?;
            let total = repo.count_articles(None).await?;
            println!("Reindexed {} articles", total);
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn summary_line(article: &Article) -> String {
    let mut flags = String::new();
    if article.archived {
        flags.push('A');
    }
    if article.is_read() {
        flags.push('R');
    }
    let tags = if article.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", article.tags.join(", "))
    };
    format!(
        "{:>5} {:<2} {}  {}{}",
        article.id,
        flags,
        article.saved_at.format("%Y-%m-%d"),
        article.display_title(),
        tags
    )
}

fn print_article(article: &Article, json: bool) -> Result<()> {
    if json {
        return print_json(article);
    }
    println!("{}", summary_line(article));
    println!("      {}", article.url);
    if let Some(author) = &article.author {
        println!("      by {}", author);
    }
    if let Some(text) = &article.text_content {
        println!();
        println!("{}", text);
    }
    Ok(())
}

fn print_list(articles: &[Article], json: bool) -> Result<()> {
    if json {
        return print_json(articles);
    }
    for article in articles {
        println!("{}", summary_line(article));
    }
    Ok(())
}

fn print_hits(hits: &[SearchHit], json: bool) -> Result<()> {
    if json {
        return print_json(hits);
    }
    for hit in hits {
        println!("{}", summary_line(&hit.article));
        println!("      {}", hit.snippet.replace('\n', " "));
    }
    Ok(())
}
