//! Error types for the recorder binary.

use golmi_logger::{ConfigError, LoggerError};

/// Top-level error for the recorder.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The session logger could not be set up.
    #[error("logger error: {source}")]
    Logger {
        /// The underlying logger error.
        #[from]
        source: LoggerError,
    },

    /// NATS connection or subscription failed.
    #[error("NATS error: {0}")]
    Nats(String),

    /// A NATS message could not be turned into a channel event.
    #[error("decode error on {subject}: {reason}")]
    Decode {
        /// Subject the message arrived on.
        subject: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {0}")]
    Signal(#[source] std::io::Error),
}
