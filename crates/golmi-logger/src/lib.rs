//! Client-side session logger for GOLMI state updates.
//!
//! The logger listens to the four state-update events the GOLMI server
//! pushes (`update_state`, `update_grippers`, `update_objs`,
//! `update_config`), stamps each with the milliseconds elapsed since the
//! session started, and keeps the resulting snapshots in order. The log,
//! together with any auxiliary data, can be saved locally or uploaded to
//! the server's `/save_log` endpoint.
//!
//! # Modules
//!
//! - [`channel`] -- In-process named-event fan-out the logger subscribes to
//! - [`clock`] -- Session clock that anchors snapshot offsets
//! - [`config`] -- Configuration loading from `golmi-logger.yaml`
//! - [`error`] -- Logger error types
//! - [`logger`] -- [`SessionLogger`], the channel-attached handle
//! - [`recorder`] -- [`SessionRecorder`], the snapshot accumulation rules
//! - [`upload`] -- Fire-and-forget HTTP upload
//!
//! [`SessionLogger`]: logger::SessionLogger
//! [`SessionRecorder`]: recorder::SessionRecorder

pub mod channel;
pub mod clock;
pub mod config;
pub mod error;
pub mod logger;
pub mod recorder;
pub mod upload;

#[cfg(test)]
mod log_capture;

pub use channel::{EventChannel, Subscription};
pub use config::{ConfigError, LoggerConfig};
pub use error::LoggerError;
pub use logger::SessionLogger;
pub use recorder::{Reaction, SessionRecorder};
pub use upload::Uploader;
