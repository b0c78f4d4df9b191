//! anistream CLI application.

use anistream::{AnimeClient, Pager, Prefetcher, SearchListing, StatusEnricher};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use shared::{Config, Resolution};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Latest releases
    Latest {
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Back-fill missing status for the first N items (configured limit if N is omitted)
        #[arg(long, value_name = "N", num_args = 0..=1)]
        enrich: Option<Option<usize>>,
    },

    /// Recommended anime
    Recommended {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Movies
    Movies,

    /// Search by title
    Search {
        query: String,

        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Collect the first N pages instead of a single one
        #[arg(long)]
        pages: Option<u32>,
    },

    /// Anime detail with its chapter list
    Detail {
        /// Anime url-id
        url_id: String,
    },

    /// Streams of one chapter
    Video {
        /// Chapter url-id
        chapter: String,

        #[arg(short, long, default_value = "720p")]
        reso: Resolution,
    },

    /// Persistent cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Write the default configuration to --config
    Init,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Show entry count and size
    Stats,
    /// Remove every cached entry
    Clear,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    shared::logging::init(shared::logging::from_config(&config, "anistream", args.verbose))?;
    info!(config_file = %args.config.display(), "Loaded configuration");

    let client = AnimeClient::from_config(&config).context("Failed to create API client")?;

    match args.command {
        Command::Latest { page, enrich } => {
            let mut items = client.get_latest(page).await;
            if let Some(limit) = enrich {
                let enricher = StatusEnricher::new(client.clone(), &config.api.enrich);
                let limit = limit.unwrap_or_else(|| enricher.limit());
                items = enricher.enrich(items, limit).await;
            }
            print_json(&items)?;
        }
        Command::Recommended { page } => {
            print_json(&client.get_recommended(page).await)?;
        }
        Command::Movies => {
            print_json(&client.get_movies().await)?;
        }
        Command::Search { query, page, pages } => match pages {
            Some(pages) if pages > 1 => {
                let prefetcher = Prefetcher::new(client.clone(), &config.api.prefetch);
                let mut pager = Pager::new(client.clone(), prefetcher, SearchListing::new(query));

                let mut results = pager.load_first().await.to_vec();
                while pager.page() < pages && pager.next_page().await {
                    results.extend_from_slice(pager.current());
                }
                info!(pages = pager.page(), results = results.len(), "Search complete");
                print_json(&results)?;
            }
            _ => print_json(&client.search_page(&query, page).await)?,
        },
        Command::Detail { url_id } => {
            let detail = client
                .get_detail(&url_id)
                .await
                .with_context(|| format!("Failed to load detail for {}", url_id))?
                .with_context(|| format!("No detail found for {}", url_id))?;
            print_json(&detail)?;
        }
        Command::Video { chapter, reso } => {
            let episode = client
                .get_video(&chapter, reso)
                .await
                .with_context(|| format!("Failed to load video for {}", chapter))?
                .with_context(|| format!("No {} video found for {}", reso, chapter))?;
            print_json(&episode)?;
        }
        Command::Cache { action } => match action {
            CacheAction::Stats => match client.cache_stats()? {
                Some(stats) => print_json(&stats)?,
                None => println!("Persistent cache is disabled"),
            },
            CacheAction::Clear => {
                client.clear_caches()?;
                println!("Cache cleared");
            }
        },
        Command::Init => {
            Config::default()
                .save(&args.config)
                .with_context(|| format!("Failed to write config to {}", args.config.display()))?;
            println!("Wrote default configuration to {}", args.config.display());
        }
    }

    Ok(())
}
