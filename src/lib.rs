pub mod device;
pub mod display;
pub mod models;
pub mod mute;
pub mod polling;
pub mod schedule;
pub mod settings;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use device::{FreeboxClient, PERMISSION_HELP};
use polling::{PollWorker, PollingController};
use schedule::{AdCache, ChannelMap, OqeeClient};
use settings::Settings;

pub async fn run() -> Result<()> {
    let loaded = Settings::load();
    init_logging(loaded.as_ref().ok().and_then(|(settings, _)| settings.log_file()))?;

    log::info!("admute starting up...");

    let (settings, ignored_env) = loaded.context("failed to load settings")?;
    for message in ignored_env {
        log::warn!("{message}");
    }
    if settings.device.app_token.is_empty() {
        log::warn!("no Freebox app token configured (FREEBOX_APP_TOKEN); login will fail");
    }

    let device = match FreeboxClient::connect(settings.freebox_config()).await {
        Ok(device) => device,
        Err(err) if err.is_fatal() => {
            eprintln!("{PERMISSION_HELP}");
            return Err(err.into());
        }
        Err(err) => return Err(anyhow::Error::new(err).context("failed to connect to the Freebox")),
    };

    let source = OqeeClient::new(settings.schedule.base_url.clone(), settings.schedule_timeout())?;
    let channels = ChannelMap::with_overrides(&settings.channels);
    log::info!("tracking ad breaks on {} channels", channels.len());

    let cache = AdCache::new(Arc::new(source), channels, settings.cache_config());
    let worker = PollWorker::new(Arc::new(device), cache);

    let mut controller = PollingController::new();
    controller.start(worker, settings.cadence())?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    log::info!("interrupt received, stopping");

    controller.stop().await
}

/// Initialize logging (reads RUST_LOG env var). With `log_file` set, records
/// are appended there so the status view can own the terminal.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    builder
        .filter_level(log::LevelFilter::Info)
        .parse_default_env();

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        eprintln!("admute: logging to {}", path.display());
    }

    builder.init();
    Ok(())
}
