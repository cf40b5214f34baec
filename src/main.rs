use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use blasted_image::application::{CacheScope, ImageEvent, ImageModule};
use blasted_image::domain::entities::{LoadRequest, Retries};
use blasted_image::infrastructure::HttpImagePort;
use blasted_image::infrastructure::config::{
    AppConfig, CliArgs, Command, ConfigStore, RequestOptions, load_manifest,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = ConfigStore::platform()?.load(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn build_request(uri: String, options: &RequestOptions, retries: Retries) -> LoadRequest {
    LoadRequest::new(uri)
        .skip_memory_cache(options.skip_memory_cache)
        .hybrid_assets(options.hybrid_assets)
        .maybe_cloud_url(options.cloud_url.clone())
        .retries(retries)
}

async fn log_events(mut rx: mpsc::UnboundedReceiver<ImageEvent>) {
    while let Some(event) = rx.recv().await {
        match &event {
            ImageEvent::AttemptFailed { .. } => debug!(%event, "Image event"),
            ImageEvent::Failed { .. } | ImageEvent::ConfigurationWarning { .. } => {
                warn!(%event, "Image event");
            }
            ImageEvent::Loaded { .. } | ImageEvent::CachesCleared(_) => {
                info!(%event, "Image event");
            }
        }
    }
}

async fn run(module: &ImageModule, command: Command, default_retries: Retries) -> Result<()> {
    match command {
        Command::Load { uri, options } => {
            let retries = options.retries.unwrap_or(default_retries);
            let outcome = module
                .load_image(build_request(uri.clone(), &options, retries))
                .await?;
            println!(
                "{uri}: loaded after {} attempt(s){}",
                outcome.attempts,
                if outcome.was_retried { " (retried)" } else { "" }
            );
        }
        Command::Preload {
            uris,
            manifest,
            options,
        } => {
            let retries = options.retries.unwrap_or(default_retries);
            let mut requests: Vec<LoadRequest> = uris
                .into_iter()
                .map(|uri| build_request(uri, &options, retries))
                .collect();
            if let Some(path) = manifest {
                requests.extend(load_manifest(&path)?.into_requests());
            }

            let summary = module.preload(requests, options.retries).await;
            println!(
                "preloaded {}/{} image(s), {} failed",
                summary.succeeded,
                summary.total(),
                summary.failed
            );
        }
        Command::Clear { target } => {
            let scope = CacheScope::from(target);
            match scope {
                CacheScope::Memory => module.clear_memory_cache().await?,
                CacheScope::Disk => module.clear_disk_cache().await?,
                CacheScope::All => module.clear_all_caches().await?,
            }
            println!("{scope} cache cleared");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = blasted_image::VERSION, "Starting {}", blasted_image::NAME);

    let port = Arc::new(HttpImagePort::open(config.http_port_config()).await?);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let module =
        ImageModule::connect_with_channel(port, config.loader.coordinator_config(), event_tx)?;
    let event_logger = tokio::spawn(log_events(event_rx));

    let result = run(&module, args.command, config.loader.retries).await;

    drop(module);
    if event_logger.await.is_err() {
        warn!("Event logger stopped unexpectedly");
    }

    result
}
