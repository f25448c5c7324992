//! Snapshot and channel event types.
//!
//! A [`Snapshot`] serializes as a two-element JSON array
//! `[offset, payload]`, where the offset is milliseconds since the session
//! started or `-1` for data that arrived before it started.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::enums::EventKind;

// ---------------------------------------------------------------------------
// Time offsets
// ---------------------------------------------------------------------------

/// Wire value of [`TimeOffset::PreStart`].
const PRE_START_SENTINEL: i64 = -1;

/// Error returned when an integer is not a valid time offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid time offset {0}: expected -1 or a non-negative millisecond count")]
pub struct InvalidOffset(pub i64);

/// Position of a snapshot on the session timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TimeOffset {
    /// Recorded before the session clock was started (`-1` on the wire).
    PreStart,
    /// Milliseconds elapsed since the session clock was started.
    Elapsed(u64),
}

impl TimeOffset {
    /// Offset of the event that starts the session.
    pub const ZERO: Self = Self::Elapsed(0);

    /// Signed wire representation.
    pub fn as_millis(self) -> i64 {
        i64::from(self)
    }
}

impl From<TimeOffset> for i64 {
    fn from(offset: TimeOffset) -> Self {
        match offset {
            TimeOffset::PreStart => PRE_START_SENTINEL,
            TimeOffset::Elapsed(ms) => Self::try_from(ms).unwrap_or(Self::MAX),
        }
    }
}

impl TryFrom<i64> for TimeOffset {
    type Error = InvalidOffset;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == PRE_START_SENTINEL {
            return Ok(Self::PreStart);
        }
        u64::try_from(value)
            .map(Self::Elapsed)
            .map_err(|_err| InvalidOffset(value))
    }
}

impl fmt::Display for TimeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreStart => f.write_str("pre-start"),
            Self::Elapsed(ms) => write!(f, "{ms}ms"),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// One entry of the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(TimeOffset, Value)", into = "(TimeOffset, Value)")]
pub struct Snapshot {
    /// When the triggering event was processed.
    pub offset: TimeOffset,
    /// Either the received update or the reconstructed full state.
    pub payload: Value,
}

impl Snapshot {
    /// Create a snapshot.
    pub const fn new(offset: TimeOffset, payload: Value) -> Self {
        Self { offset, payload }
    }
}

impl From<(TimeOffset, Value)> for Snapshot {
    fn from((offset, payload): (TimeOffset, Value)) -> Self {
        Self { offset, payload }
    }
}

impl From<Snapshot> for (TimeOffset, Value) {
    fn from(snapshot: Snapshot) -> Self {
        (snapshot.offset, snapshot.payload)
    }
}

// ---------------------------------------------------------------------------
// Export object
// ---------------------------------------------------------------------------

/// The uploaded/exported object: `{"log": [...], ...auxiliary}`.
///
/// Auxiliary keys are flattened next to `log`. The logger never stores
/// auxiliary data under `log`, so the flattened map cannot shadow it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Snapshots in recording order.
    pub log: Vec<Snapshot>,
    /// Auxiliary key/value data.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Channel events
// ---------------------------------------------------------------------------

/// A named event delivered over the client/server channel.
///
/// The name is kept as a string so the channel can carry events the logger
/// does not care about (`attach_gripper`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEvent {
    /// Event name, e.g. `update_state`.
    pub name: String,
    /// Opaque JSON payload.
    pub payload: Value,
}

impl ChannelEvent {
    /// Create an event with an arbitrary name.
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Create an event for one of the kinds the logger reacts to.
    pub fn of_kind(kind: EventKind, payload: Value) -> Self {
        Self::new(kind.name(), payload)
    }

    /// The logger-relevant kind of this event, if any.
    pub fn kind(&self) -> Option<EventKind> {
        self.name.parse().ok()
    }
}
