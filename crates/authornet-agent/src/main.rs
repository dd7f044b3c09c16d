//! authornet — author discovery over the ADS search index.
//! Entry point for the CLI and web server binary.

mod config;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use authornet_ingestion::gender::{GenderDetector, NameTable};
use authornet_ingestion::pipeline::{collect_top_authors, suggest_authors};
use authornet_ingestion::request::{OneOrMany, SuggestRequest};
use authornet_ingestion::sources::ads::AdsClient;
use authornet_ingestion::sources::SearchIndex;

#[derive(Debug, Parser)]
#[command(name = "authornet", version, about = "Suggest authors related to a set of seed names")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the most prolific authors reachable from the given names
    Suggest {
        /// Seed names, e.g. "Casey, A"
        #[arg(required = true)]
        names: Vec<String>,
        /// How many authors to print
        #[arg(short, long, default_value_t = 10)]
        number: usize,
        /// Author position that triggers a similarity search (repeatable; -1 is the last author)
        #[arg(long = "similarity-index", default_values_t = [0], allow_negative_numbers = true)]
        similarity_indices: Vec<isize>,
        /// Only follow the seed names' own pages
        #[arg(long, conflicts_with = "similarity_indices")]
        no_similarity: bool,
    },
    /// Serve the HTTP API
    Serve {
        /// Address to listen on; overrides the config file and AUTHORNET_BIND
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("authornet=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::Config::load()?;
    info!(version = env!("CARGO_PKG_VERSION"), base_url = %config.ads.base_url, "Configuration loaded");

    let index: Arc<dyn SearchIndex> = Arc::new(AdsClient::new(
        &config.ads.base_url,
        config.ads_token(),
        config.ads_timeout(),
    )?);
    let gender: Arc<dyn GenderDetector> = match &config.collate.gender_table {
        Some(path) => Arc::new(NameTable::load(Path::new(path))?),
        None => {
            info!("No gender table configured; every guess will be unknown");
            Arc::new(NameTable::empty())
        }
    };
    let defaults = config.suggest_defaults();

    match cli.command {
        Command::Suggest { names, number, similarity_indices, no_similarity } => {
            let mut request = SuggestRequest::for_names(names);
            if !no_similarity {
                request.similarity_search_on_author_indices =
                    Some(OneOrMany::Many(similarity_indices));
            }
            let plan = request.normalize(&defaults)?;
            let top = collect_top_authors(suggest_authors(index, plan, gender), number)
                .await
                .context("suggestion run failed")?;
            for profile in top {
                println!("{}\t{}", profile.full_name, profile.number_of_articles);
            }
        }
        Command::Serve { bind } => {
            let bind_addr = bind.unwrap_or_else(|| config.bind_addr());
            let state = authornet_web::state::AppState::new(index, gender, defaults);
            let router = authornet_web::router::build_router(state);

            let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
            info!("Listening on http://{}", bind_addr);
            info!("   Suggest: POST http://{}/api/suggest", bind_addr);
            info!("   Health:  GET  http://{}/health", bind_addr);

            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}
