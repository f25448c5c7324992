//! Session clock.
//!
//! The clock is unset until the first qualifying full-state update. Once
//! started it stays fixed until the logger is cleared, and every snapshot
//! offset is measured against it.

use chrono::{DateTime, Utc};
use golmi_types::TimeOffset;

/// Reference timestamp for snapshot offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionClock {
    started_at: Option<DateTime<Utc>>,
}

impl SessionClock {
    /// An unset clock.
    pub const fn new() -> Self {
        Self { started_at: None }
    }

    /// Whether the session has officially started.
    pub const fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// When the session started, if it has.
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Start the session at `now`.
    ///
    /// Has no effect if the clock is already running; the start time is
    /// immutable until [`reset`](Self::reset).
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Offset of `now` from the session start, or `None` before the start.
    ///
    /// A wall clock that stepped backwards yields an offset of zero rather
    /// than a negative value, which would collide with the pre-start sentinel.
    pub fn offset_at(&self, now: DateTime<Utc>) -> Option<TimeOffset> {
        let started_at = self.started_at?;
        let elapsed = now.signed_duration_since(started_at).num_milliseconds();
        Some(TimeOffset::Elapsed(u64::try_from(elapsed).unwrap_or(0)))
    }

    /// Unset the clock so the next qualifying event restarts timing at zero.
    pub fn reset(&mut self) {
        self.started_at = None;
    }
}
