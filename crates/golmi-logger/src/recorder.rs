//! Snapshot accumulation state machine.
//!
//! [`SessionRecorder`] holds everything the logger knows: the snapshot log,
//! the accumulated `{objs, grippers, config}` substate, the session clock
//! and the auxiliary data. It is synchronous and takes the current time as
//! an argument, so every rule can be exercised without a runtime or a
//! real clock. [`SessionLogger`](crate::SessionLogger) wraps it for use
//! behind a channel.
//!
//! # Recording rules
//!
//! | Event              | Clock unset                                   | Clock set          |
//! |--------------------|-----------------------------------------------|--------------------|
//! | `update_state`     | skip if `objs` and `grippers` are empty, else start clock at 0 | record |
//! | `update_grippers`  | ignore                                        | record             |
//! | `update_objs`      | ignore                                        | record             |
//! | `update_config`    | full: cache in substate; delta: record at -1  | record             |

use chrono::{DateTime, Utc};
use golmi_types::{
    ChannelEvent, EventKind, ExportDocument, LogMode, RESERVED_LOG_KEY, Snapshot, TimeOffset,
};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::clock::SessionClock;
use crate::error::LoggerError;

/// What the recorder did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// A snapshot was appended at the given offset.
    Recorded(TimeOffset),
    /// The first full-state update had no objects and no grippers.
    SkippedEmptyState,
    /// A partial update arrived before the session started.
    NotStarted,
    /// Config arrived before the session started and was kept for later
    /// full-state snapshots without being logged.
    ConfigCached,
}

impl Reaction {
    /// Whether this reaction appended to the log.
    pub const fn is_recorded(self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

// ---------------------------------------------------------------------------
// Substate
// ---------------------------------------------------------------------------

/// Latest known objects, grippers and config.
#[derive(Debug, Clone, PartialEq)]
struct Substate {
    objs: Value,
    grippers: Value,
    config: Value,
}

impl Default for Substate {
    fn default() -> Self {
        Self {
            objs: empty_mapping(),
            grippers: empty_mapping(),
            config: empty_mapping(),
        }
    }
}

impl Substate {
    /// Overwrite the part of the substate that `kind` carries.
    fn apply(&mut self, kind: EventKind, payload: Value) {
        match kind {
            EventKind::State => {
                self.objs = field_or_empty(&payload, "objs");
                self.grippers = field_or_empty(&payload, "grippers");
            }
            EventKind::Grippers => self.grippers = payload,
            EventKind::Objs => self.objs = payload,
            EventKind::Config => self.config = payload,
        }
    }

    /// The complete reconstructed state.
    fn to_value(&self) -> Value {
        let mut state = Map::with_capacity(3);
        state.insert("objs".to_owned(), self.objs.clone());
        state.insert("grippers".to_owned(), self.grippers.clone());
        state.insert("config".to_owned(), self.config.clone());
        Value::Object(state)
    }
}

fn empty_mapping() -> Value {
    Value::Object(Map::new())
}

fn field_or_empty(payload: &Value, key: &str) -> Value {
    payload.get(key).cloned().unwrap_or_else(empty_mapping)
}

/// Missing, `null` and `{}` all count as "nothing there yet".
fn is_empty_mapping(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Wrap a partial update under its delta key (`gripper`, `objs`, `config`).
fn wrap_delta(kind: EventKind, payload: Value) -> Value {
    match kind.delta_key() {
        Some(key) => {
            let mut wrapped = Map::with_capacity(1);
            wrapped.insert(key.to_owned(), payload);
            Value::Object(wrapped)
        }
        None => payload,
    }
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// All mutable state of one logging session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecorder {
    mode: LogMode,
    clock: SessionClock,
    log: Vec<Snapshot>,
    substate: Substate,
    data: Map<String, Value>,
}

impl SessionRecorder {
    /// A fresh recorder for the given mode.
    pub fn new(mode: LogMode) -> Self {
        Self {
            mode,
            clock: SessionClock::new(),
            log: Vec::new(),
            substate: Substate::default(),
            data: Map::new(),
        }
    }

    /// The logging mode fixed at construction.
    pub const fn mode(&self) -> LogMode {
        self.mode
    }

    /// The session clock.
    pub const fn clock(&self) -> &SessionClock {
        &self.clock
    }

    /// Recorded snapshots in order.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.log
    }

    /// Auxiliary data added so far.
    pub const fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// React to a channel event at time `now`.
    ///
    /// Returns `None` for events the logger does not subscribe to.
    pub fn handle_event(&mut self, event: ChannelEvent, now: DateTime<Utc>) -> Option<Reaction> {
        let kind = event.kind()?;
        Some(self.handle(kind, event.payload, now))
    }

    /// React to one of the four subscribed event kinds at time `now`.
    pub fn handle(&mut self, kind: EventKind, payload: Value, now: DateTime<Utc>) -> Reaction {
        if kind == EventKind::State && !self.clock.is_started() {
            if is_empty_mapping(payload.get("objs")) && is_empty_mapping(payload.get("grippers"))
            {
                debug!("ignoring empty initial state");
                return Reaction::SkippedEmptyState;
            }
            self.clock.start(now);
            info!(mode = %self.mode, started_at = %now, "logging session started");
        }

        let offset = match self.clock.offset_at(now) {
            Some(offset) => offset,
            None if kind == EventKind::Config => return self.handle_early_config(payload),
            None => {
                debug!(event = %kind, "session not started, update not logged");
                return Reaction::NotStarted;
            }
        };

        let snapshot = if self.mode.is_full_state() {
            self.substate.apply(kind, payload);
            self.substate.to_value()
        } else {
            wrap_delta(kind, payload)
        };
        self.push(kind, offset, snapshot)
    }

    /// Config that arrives before the first real state.
    fn handle_early_config(&mut self, payload: Value) -> Reaction {
        match self.mode {
            LogMode::Full => {
                self.substate.apply(EventKind::Config, payload);
                debug!("config cached until the session starts");
                Reaction::ConfigCached
            }
            LogMode::Delta => {
                let snapshot = wrap_delta(EventKind::Config, payload);
                self.push(EventKind::Config, TimeOffset::PreStart, snapshot)
            }
        }
    }

    fn push(&mut self, kind: EventKind, offset: TimeOffset, payload: Value) -> Reaction {
        self.log.push(Snapshot::new(offset, payload));
        debug!(event = %kind, %offset, entries = self.log.len(), "snapshot recorded");
        Reaction::Recorded(offset)
    }

    /// Store auxiliary data to be exported alongside the log.
    ///
    /// An existing value under `key` is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::ReservedKey`] for the key `"log"`; the data is
    /// left untouched.
    pub fn add_data(&mut self, key: &str, value: Value) -> Result<(), LoggerError> {
        if key == RESERVED_LOG_KEY {
            error!(key, "refusing to overwrite the snapshot log with auxiliary data");
            return Err(LoggerError::ReservedKey {
                key: key.to_owned(),
            });
        }
        self.data.insert(key.to_owned(), value);
        Ok(())
    }

    /// Reset to the freshly constructed state, keeping only the mode.
    pub fn clear(&mut self) {
        *self = Self::new(self.mode);
        info!(mode = %self.mode, "logging session cleared");
    }

    /// Copy the current log and auxiliary data into an export object.
    pub fn export(&self) -> ExportDocument {
        ExportDocument {
            log: self.log.clone(),
            data: self.data.clone(),
        }
    }
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self::new(LogMode::default())
    }
}
