use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use otx_client::OtxClient;
use pulsegraph_common::Config;
use pulsegraph_graph::{GraphClient, GraphWriter, IndicatorStore, MemoryGraph};
use pulsegraph_ingest::{summarize, Pipeline, PulseFeed};

#[derive(Parser)]
#[command(name = "pulsegraph", about = "Import OTX threat pulses into a Neo4j graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch subscribed pulses and merge them into the graph
    Import {
        /// Highest page to request (overrides OTX_MAX_PAGES)
        #[arg(long)]
        max_pages: Option<u32>,

        /// Write into an in-memory graph instead of Neo4j
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch subscribed pulses and print an indicator breakdown; writes nothing
    Summary {
        /// Highest page to request (overrides OTX_MAX_PAGES)
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// Print node and edge counts currently in the graph
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("pulsegraph=info".parse()?)
                .add_directive("otx_client=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Import { max_pages, dry_run } => import(max_pages, dry_run).await,
        Command::Summary { max_pages } => summary(max_pages).await,
        Command::Stats => stats().await,
    }
}

fn feed_client(config: &Config) -> Result<OtxClient> {
    Ok(OtxClient::new(&config.otx_api_key)
        .context("Failed to build OTX client")?
        .with_base_url(&config.otx_base_url))
}

async fn connect(config: &Config) -> Result<GraphWriter> {
    let client =
        GraphClient::connect(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password)
            .await
            .context("Failed to connect to Neo4j")?;
    Ok(GraphWriter::new(client))
}

async fn import(max_pages: Option<u32>, dry_run: bool) -> Result<()> {
    let config = if dry_run {
        Config::feed_from_env()?
    } else {
        Config::from_env()?
    };
    config.log_redacted();

    let max_pages = max_pages.unwrap_or(config.max_pages);
    let feed: Arc<dyn PulseFeed> = Arc::new(feed_client(&config)?);
    let store: Arc<dyn IndicatorStore> = if dry_run {
        info!("Dry run: writing to an in-memory graph");
        Arc::new(MemoryGraph::new())
    } else {
        Arc::new(connect(&config).await?)
    };

    info!(max_pages, "Pulse import starting...");
    let stats = Pipeline::new(feed, store.clone(), max_pages).run().await?;

    if stats.fetch_stop.is_failure() {
        warn!("Fetch stopped early: {}", stats.fetch_stop);
    }
    info!("Pulse import complete. {stats}");

    if dry_run {
        let counts = store.counts().await?;
        info!("Dry-run graph state: {counts}");
    }

    Ok(())
}

async fn summary(max_pages: Option<u32>) -> Result<()> {
    let config = Config::feed_from_env()?;
    config.log_redacted();

    let max_pages = max_pages.unwrap_or(config.max_pages);
    let report = feed_client(&config)?.fetch_all_pulses(max_pages).await;
    if report.stop.is_failure() {
        warn!("Fetch stopped early: {}", report.stop);
    }

    println!("{}", summarize(&report.pulses));
    Ok(())
}

async fn stats() -> Result<()> {
    let config = Config::from_env()?;
    let writer = connect(&config).await?;
    let counts = writer.counts().await.context("Failed to read graph counts")?;
    println!("{counts}");
    Ok(())
}
