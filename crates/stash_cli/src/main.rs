use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use stash_ai::flows;
use stash_core::{ArticleStore, Error, NewArticle, Result};
use stash_storage::SqliteStore;

#[derive(Parser, Debug)]
#[command(author, version, about = "Personal read-it-later article archive", long_about = None)]
pub struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, default_value = "memory")]
    storage: String,

    /// Database file for the sqlite backend
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Model to use for extraction and relevance: dummy (default) or openai
    #[arg(long, default_value = "dummy")]
    model: String,

    /// API key for the model endpoint
    #[arg(long, env = "STASH_API_KEY")]
    api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long)]
    model_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
    /// Extract, normalize and save one URL
    Add {
        #[arg(long)]
        user: String,
        url: String,
    },
    /// List saved articles, newest first
    List {
        #[arg(long)]
        user: String,
    },
    /// Score one saved article against the user's reading history
    Relevance {
        #[arg(long)]
        user: String,
        article_id: String,
    },
}

async fn create_storage(cli: &Cli) -> Result<Arc<dyn ArticleStore>> {
    match (cli.storage.as_str(), cli.db_path.as_deref()) {
        ("sqlite", Some(path)) => Ok(Arc::new(SqliteStore::new_with_path(path).await?)),
        (kind, _) => stash_storage::create_store(kind).await,
    }
}

async fn check_storage(storage: &Arc<dyn ArticleStore>, storage_type: &str) -> Result<()> {
    // A cheap read proves the backend is reachable before we take requests.
    storage.list_articles("healthcheck").await?;
    info!("🏦 Storage backend initialized successfully (using {storage_type})");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let storage = create_storage(&cli).await?;
    check_storage(&storage, &cli.storage).await?;

    let config = stash_ai::Config {
        api_key: cli.api_key.clone(),
        model_name: Some(cli.model.clone()),
        model_url: cli.model_url.clone(),
    };
    let model = stash_ai::create_model(Some(config)).await?;
    info!("🧠 Extraction model initialized successfully (using {})", model.name());

    match cli.command {
        Commands::Serve { addr } => {
            let app = stash_web::create_app(stash_web::AppState {
                store: storage,
                model,
            })
            .await;
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("📚 Archive listening on {addr}");
            axum::serve(listener, app).await?;
        }
        Commands::Add { user, url } => {
            let parsed = url::Url::parse(&url).map_err(|_| Error::InvalidUrl(url.clone()))?;
            let info = flows::extract_article_info(model.as_ref(), parsed.as_str()).await;
            if info.is_degraded() {
                info!("⚠️ extraction degraded: {}", info.title);
            }
            let record = storage
                .add_article(
                    &user,
                    NewArticle {
                        title: info.title,
                        summary: info.summary,
                        url,
                        image_url: info.image_url,
                        data_ai_hint: info.data_ai_hint,
                        source_name: parsed.host_str().map(String::from),
                        content: None,
                        tags: vec![],
                    },
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::List { user } => {
            for article in storage.list_articles(&user).await? {
                let marker = if article.is_read { "✓" } else { " " };
                println!("{marker} {}  {}  {}", article.date_added.format("%Y-%m-%d"), article.id, article.title);
            }
        }
        Commands::Relevance { user, article_id } => {
            let mut record = storage.get_article(&user, &article_id).await?;
            let history = storage.get_profile(&user).await?.reading_history;
            let content = record
                .content
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| record.summary.clone());
            let assessment =
                flows::predict_article_relevance(model.as_ref(), &content, &history).await?;
            record.ai_relevance = Some(assessment.clone());
            storage.update_article(&user, &record).await?;
            println!("score: {:.2}\nreasoning: {}", assessment.score, assessment.reasoning);
        }
    }

    Ok(())
}
