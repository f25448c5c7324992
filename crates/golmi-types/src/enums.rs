//! Enumeration types shared between the logger and its bootstrap.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what}: {value}")]
pub struct ParseEnumError {
    /// Which enum was being parsed.
    pub what: &'static str,
    /// The rejected input.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// A named state-update event the logger subscribes to.
///
/// The serialized form is the event name the GOLMI server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Complete state: `{objs, grippers}`.
    #[serde(rename = "update_state")]
    State,
    /// Gripper substate only.
    #[serde(rename = "update_grippers")]
    Grippers,
    /// Object substate only.
    #[serde(rename = "update_objs")]
    Objs,
    /// Board configuration.
    #[serde(rename = "update_config")]
    Config,
}

impl EventKind {
    /// Every kind the logger reacts to.
    pub const ALL: [Self; 4] = [Self::State, Self::Grippers, Self::Objs, Self::Config];

    /// The event name used on the channel.
    pub const fn name(self) -> &'static str {
        match self {
            Self::State => "update_state",
            Self::Grippers => "update_grippers",
            Self::Objs => "update_objs",
            Self::Config => "update_config",
        }
    }

    /// Key under which a delta-mode snapshot wraps this event's payload.
    ///
    /// The gripper key is singular on the wire. Full-state events are
    /// recorded unwrapped and have no key.
    pub const fn delta_key(self) -> Option<&'static str> {
        match self {
            Self::State => None,
            Self::Grippers => Some("gripper"),
            Self::Objs => Some("objs"),
            Self::Config => Some("config"),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ParseEnumError {
                what: "event kind",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Logging mode
// ---------------------------------------------------------------------------

/// How each snapshot's payload is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    /// Every snapshot holds the complete reconstructed `{objs, grippers, config}`.
    #[default]
    Full,
    /// Every snapshot holds only the update that triggered it.
    Delta,
}

impl LogMode {
    /// Whether snapshots are reconstructed from accumulated substate.
    pub const fn is_full_state(self) -> bool {
        matches!(self, Self::Full)
    }

    /// Pick a mode from the boolean "full state" flag.
    pub const fn from_full_state(full_state: bool) -> Self {
        if full_state { Self::Full } else { Self::Delta }
    }
}

impl fmt::Display for LogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Delta => f.write_str("delta"),
        }
    }
}

impl FromStr for LogMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" | "full_state" | "full-state" => Ok(Self::Full),
            "delta" => Ok(Self::Delta),
            other => Err(ParseEnumError {
                what: "log mode",
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn event_names_match_server() {
        assert_eq!(EventKind::State.name(), "update_state");
        assert_eq!(EventKind::Grippers.name(), "update_grippers");
        assert_eq!(EventKind::Objs.name(), "update_objs");
        assert_eq!(EventKind::Config.name(), "update_config");
    }

    #[test]
    fn event_kind_parses_from_name() {
        for kind in EventKind::ALL {
            assert_eq!(kind.name().parse::<EventKind>().unwrap(), kind);
        }
        assert!("attach_gripper".parse::<EventKind>().is_err());
    }

    #[test]
    fn event_kind_serde_uses_channel_name() {
        let json = serde_json::to_string(&EventKind::Grippers).unwrap();
        assert_eq!(json, "\"update_grippers\"");
    }

    #[test]
    fn gripper_delta_key_is_singular() {
        assert_eq!(EventKind::Grippers.delta_key(), Some("gripper"));
        assert_eq!(EventKind::Objs.delta_key(), Some("objs"));
        assert_eq!(EventKind::Config.delta_key(), Some("config"));
        assert_eq!(EventKind::State.delta_key(), None);
    }

    #[test]
    fn log_mode_defaults_to_full() {
        assert_eq!(LogMode::default(), LogMode::Full);
        assert!(LogMode::default().is_full_state());
    }

    #[test]
    fn log_mode_parsing() {
        assert_eq!("full".parse::<LogMode>().unwrap(), LogMode::Full);
        assert_eq!("Full-State".parse::<LogMode>().unwrap(), LogMode::Full);
        assert_eq!("DELTA".parse::<LogMode>().unwrap(), LogMode::Delta);
        let err = "partial".parse::<LogMode>().unwrap_err();
        assert_eq!(err.value, "partial");
    }

    #[test]
    fn log_mode_from_flag() {
        assert_eq!(LogMode::from_full_state(true), LogMode::Full);
        assert_eq!(LogMode::from_full_state(false), LogMode::Delta);
    }
}
