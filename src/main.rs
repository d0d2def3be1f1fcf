use anyhow::Result;
use availarr::config::Configuration;
use availarr::dispatch::{LogSink, NotificationSink, WebhookSink};
use availarr::engine::AvailabilityEngine;
use availarr::http::HttpClient;
use availarr::metadata::MetadataRouter;
use availarr::musicbrainz::MusicBrainzClient;
use availarr::scenario::Scenario;
use availarr::store::InMemoryRequestStore;
use availarr::tmdb::TmdbClient;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the configuration file and exit
    Check,
    /// Feed a scenario of media writes through the engine
    Replay {
        /// Path to the scenario file
        scenario: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .init();

    info!("Starting Availarr v{}", env!("CARGO_PKG_VERSION"));

    let config = Configuration::from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    match cli.command {
        Command::Check => {
            info!(
                workers = config.workers(),
                queue_capacity = config.queue_capacity(),
                tmdb = config.tmdb.is_some(),
                musicbrainz = config.musicbrainz.is_some(),
                webhook = config.webhook.is_some(),
                "Configuration is valid"
            );
            Ok(())
        }
        Command::Replay { scenario } => replay(&config, &scenario).await,
    }
}

async fn replay(config: &Configuration, path: &str) -> Result<()> {
    let scenario = Scenario::from_file(path)?;
    info!(
        requests = scenario.requests.len(),
        writes = scenario.writes.len(),
        "Scenario loaded from: {}",
        path
    );

    let http_client = HttpClient::new()?;

    let tmdb = config
        .tmdb
        .clone()
        .map(|c| TmdbClient::new(http_client.clone(), c));
    if tmdb.is_none() {
        warn!("No TMDB configuration found, movie and series notifications will be skipped");
    }
    let musicbrainz = Some(MusicBrainzClient::new(
        http_client.clone(),
        config.musicbrainz.clone().unwrap_or_default(),
    ));

    let sink: Arc<dyn NotificationSink> = match config.webhook {
        Some(ref webhook) => Arc::new(WebhookSink::new(http_client.clone(), webhook.clone())),
        None => Arc::new(LogSink),
    };

    let store = Arc::new(InMemoryRequestStore::with_requests(scenario.requests.clone()));
    let engine = AvailabilityEngine::new(
        config,
        store.clone(),
        Arc::new(MetadataRouter::new(tmdb, musicbrainz)),
        sink,
    );

    let queued = scenario.replay(&engine);
    info!("Queued {} transitions, waiting for workers", queued);
    engine.shutdown().await;

    for request in store.all().await {
        println!(
            "request {} (media {}, {}): {:?}",
            request.id,
            request.media_id,
            request.variant(),
            request.status
        );
    }

    info!("Replay completed");
    Ok(())
}
