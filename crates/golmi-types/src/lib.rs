//! Shared wire types for the GOLMI session logger.
//!
//! These types describe what travels over the event channel (named
//! state-update events) and what the logger produces (time-offset
//! snapshots). They serialize to the exact JSON shapes the GOLMI server
//! and its `/save_log` endpoint expect.
//!
//! # Modules
//!
//! - [`enums`] -- Event kinds and logging modes
//! - [`structs`] -- Time offsets, snapshots, the export object and channel events

pub mod enums;
pub mod structs;

pub use enums::{EventKind, LogMode, ParseEnumError};
pub use structs::{ChannelEvent, ExportDocument, InvalidOffset, Snapshot, TimeOffset};

/// Top-level key of the export object that holds the snapshot log.
///
/// Auxiliary data may not be stored under this key.
pub const RESERVED_LOG_KEY: &str = "log";
