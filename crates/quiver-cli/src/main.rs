mod config;

use clap::{Parser, Subcommand};
use quiver_core::SearchStrategy;
use quiver_index::{provider_from_config, SearchEngine};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quiver", about = "Quiver: in-memory semantic search")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "quiver.toml")]
    config: PathBuf,

    /// API key for the http embedding provider (used when the config has none)
    #[arg(long, env = "QUIVER_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed an item file and save the resulting vectors
    Index {
        /// JSON array of `{id, text, meta?}`
        #[arg(long)]
        items: PathBuf,
        /// Snapshot file to write
        #[arg(long)]
        out: PathBuf,
    },
    /// Search a saved snapshot
    Search {
        /// Snapshot file to search
        #[arg(long)]
        vectors: PathBuf,
        /// Ranking strategy: cosine, softmax or mmr
        #[arg(long, default_value = "cosine")]
        strategy: SearchStrategy,
        /// Number of results (overrides config)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Softmax temperature (overrides config)
        #[arg(long)]
        temperature: Option<f32>,
        /// MMR relevance/diversity balance (overrides config)
        #[arg(long)]
        lambda: Option<f32>,
        /// Blend the query with its N nearest neighbours before ranking
        /// (N defaults to `default_neighbors` from the config)
        #[arg(long, value_name = "N", num_args = 0..=1, conflicts_with = "strategy")]
        expand: Option<Option<usize>>,
        /// Query text
        query: String,
    },
    /// List the items most similar to a stored item
    Similar {
        /// Snapshot file to search
        #[arg(long)]
        vectors: PathBuf,
        /// Number of results (overrides config)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Id of the stored item
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = config::load_config(&cli.config)?.with_api_key_fallback(cli.api_key);
    let provider = provider_from_config(&config.provider)?;
    let engine = SearchEngine::new(config.engine)?;
    engine.init_provider(provider).await;

    match cli.command {
        Commands::Index { items, out } => {
            engine.load_items_from_file(&items).await?;
            engine.save(&out).await?;
            let count = engine.len().await;
            info!(count, out = %out.display(), "Index written");
        }
        Commands::Search {
            vectors,
            strategy,
            limit,
            temperature,
            lambda,
            expand,
            query,
        } => {
            engine.load(&vectors, false).await?;

            let defaults = engine.default_options();
            let limit = limit.unwrap_or(defaults.limit);

            let json = if let Some(neighbors) = expand {
                let neighbors = neighbors.unwrap_or(engine.config().default_neighbors);
                serde_json::to_string_pretty(
                    &engine.search_with_expansion(&query, limit, neighbors).await?,
                )?
            } else {
                let mut options = defaults.with_strategy(strategy).with_limit(limit);
                if let Some(t) = temperature {
                    options = options.with_temperature(t);
                }
                if let Some(l) = lambda {
                    options = options.with_mmr_lambda(l);
                }
                serde_json::to_string_pretty(&engine.search_with(&query, options).await?)?
            };
            println!("{json}");
        }
        Commands::Similar { vectors, limit, id } => {
            engine.load(&vectors, false).await?;
            let limit = limit.unwrap_or(engine.config().default_limit);
            let results = engine.similar_to(&id, limit).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    Ok(())
}
