//! Session recorder entry point.
//!
//! Bootstraps a [`SessionLogger`] against state updates arriving over NATS
//! and keeps recording until Ctrl-C, then saves and uploads the log.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`GOLMI_CONFIG`, default `golmi-logger.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Create the event channel and attach the session logger
//! 4. Record session metadata as auxiliary data
//! 5. Connect to NATS and forward state updates into the channel
//! 6. On Ctrl-C: stop forwarding, optionally save to disk, upload

mod error;
mod nats;

use std::path::Path;

use chrono::Utc;
use golmi_logger::config::LoggingConfig;
use golmi_logger::{EventChannel, LoggerConfig, SessionLogger, Uploader};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::error::RecorderError;
use crate::nats::NatsBridge;

/// Config file used when `GOLMI_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "golmi-logger.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, NATS setup or the signal handler fail.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path =
        std::env::var("GOLMI_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    let config = LoggerConfig::from_file(Path::new(&config_path)).map_err(RecorderError::from)?;

    init_tracing(&config.logging);
    info!("golmi-recorder starting");
    info!(
        config_path = %config_path,
        mode = %config.logger.mode,
        upload_url = %config.upload.base_url,
        upload_path = %config.upload.path,
        nats_url = %config.channel.nats_url,
        subject_prefix = %config.channel.subject_prefix,
        "configuration loaded"
    );

    let channel = EventChannel::new();
    let uploader = Uploader::new(&config.upload).map_err(RecorderError::from)?;
    let logger = SessionLogger::attach(&channel, config.logger.mode, uploader);

    let session_id = Uuid::now_v7();
    logger
        .add_data("session_id", json!(session_id.to_string()))
        .map_err(RecorderError::from)?;
    logger
        .add_data("recorder_started_at", json!(Utc::now().to_rfc3339()))
        .map_err(RecorderError::from)?;
    info!(%session_id, "session metadata recorded");

    let bridge = NatsBridge::connect(&config.channel.nats_url, &config.channel.subject_prefix).await?;
    let subscriber = bridge.subscribe().await?;
    let forwarding = tokio::spawn(bridge.forward(subscriber, channel.clone()));

    info!("recording, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await.map_err(RecorderError::Signal)?;
    info!("shutdown requested");
    forwarding.abort();

    if let Some(path) = &config.upload.save_path {
        if let Err(e) = logger.save_to_file(path) {
            warn!(path = %path.display(), error = %e, "failed to save session log");
        }
    }

    if let Err(e) = logger.upload(None).await {
        warn!(error = %e, "upload task did not complete");
    }

    info!(
        entries = logger.len(),
        started = logger.is_started(),
        "golmi-recorder stopped"
    );
    Ok(())
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
