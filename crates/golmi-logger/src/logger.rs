//! The session logger attached to an event channel.
//!
//! Attaching is subscribing: [`SessionLogger::attach`] subscribes to the four
//! state-update events and spawns a reaction task that feeds them, in
//! delivery order, into a shared [`SessionRecorder`]. Public operations take
//! the same lock, so reactions and `add_data`/`clear` never interleave.
//!
//! ```text
//! channel --> Subscription --> reaction task --> SessionRecorder <-- add_data / clear
//!                                                      |
//!                                                   export --> Uploader (spawned POST)
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use golmi_types::{EventKind, ExportDocument, LogMode, Snapshot};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::channel::{EventChannel, Subscription};
use crate::error::LoggerError;
use crate::recorder::SessionRecorder;
use crate::upload::Uploader;

/// Records state updates from a channel for the lifetime of the value.
///
/// Dropping the logger stops the reaction task. Clearing does not.
#[derive(Debug)]
pub struct SessionLogger {
    recorder: Arc<Mutex<SessionRecorder>>,
    uploader: Uploader,
    processed: watch::Receiver<u64>,
    reactions: JoinHandle<()>,
}

impl SessionLogger {
    /// Subscribe to `channel` and start reacting to state updates.
    ///
    /// Events emitted after this call returns are guaranteed to be seen.
    /// Must be called from within a Tokio runtime.
    pub fn attach(channel: &EventChannel, mode: LogMode, uploader: Uploader) -> Self {
        let subscription = channel.subscribe(&EventKind::ALL);
        let recorder = Arc::new(Mutex::new(SessionRecorder::new(mode)));
        let (processed_tx, processed) = watch::channel(0);
        let reactions = tokio::spawn(react(subscription, Arc::clone(&recorder), processed_tx));
        info!(%mode, "session logger attached");
        Self {
            recorder,
            uploader,
            processed,
            reactions,
        }
    }

    fn recorder(&self) -> MutexGuard<'_, SessionRecorder> {
        lock(&self.recorder)
    }

    /// The logging mode chosen at attach time.
    pub fn mode(&self) -> LogMode {
        self.recorder().mode()
    }

    /// Whether the session clock is running.
    pub fn is_started(&self) -> bool {
        self.recorder().clock().is_started()
    }

    /// Number of recorded snapshots.
    pub fn len(&self) -> usize {
        self.recorder().snapshots().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.recorder().snapshots().is_empty()
    }

    /// Copy of the recorded snapshots.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.recorder().snapshots().to_vec()
    }

    /// Copy of the auxiliary data.
    pub fn data(&self) -> Map<String, Value> {
        self.recorder().data().clone()
    }

    /// Store auxiliary data to export alongside the log.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::ReservedKey`] if `key` is `"log"`. The
    /// rejection is also reported as an error diagnostic and nothing is
    /// stored.
    pub fn add_data(&self, key: &str, value: Value) -> Result<(), LoggerError> {
        self.recorder().add_data(key, value)
    }

    /// Reset log, substate, clock and auxiliary data.
    ///
    /// The channel subscription stays in place.
    pub fn clear(&self) {
        self.recorder().clear();
    }

    /// The current export object.
    pub fn export(&self) -> ExportDocument {
        self.recorder().export()
    }

    /// Upload the export object without waiting for the result.
    ///
    /// `endpoint` may be a path on the configured server or an absolute
    /// URL; `None` uses the configured default (`/save_log`). The outcome
    /// is only logged. The returned handle lets a shutting-down process
    /// wait for the request.
    pub fn upload(&self, endpoint: Option<&str>) -> JoinHandle<()> {
        let document = self.export();
        debug!(entries = document.log.len(), "dispatching session log upload");
        self.uploader.dispatch(endpoint, document)
    }

    /// Write the export object to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Serialization`] or [`LoggerError::Io`].
    pub fn save_to_file(&self, path: &Path) -> Result<(), LoggerError> {
        let document = self.export();
        let text = serde_json::to_string_pretty(&document)?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), entries = document.log.len(), "session log saved");
        Ok(())
    }

    /// Number of subscribed events the reaction task has handled, including
    /// those that did not produce a snapshot.
    pub fn events_processed(&self) -> u64 {
        *self.processed.borrow()
    }

    /// Wait until at least `count` subscribed events have been handled.
    ///
    /// Returns early if the reaction task has stopped.
    pub async fn wait_for_events(&self, count: u64) {
        let mut processed = self.processed.clone();
        if processed.wait_for(|seen| *seen >= count).await.is_err() {
            debug!(count, "reaction task stopped before reaching event count");
        }
    }
}

impl Drop for SessionLogger {
    fn drop(&mut self) {
        self.reactions.abort();
    }
}

fn lock(recorder: &Mutex<SessionRecorder>) -> MutexGuard<'_, SessionRecorder> {
    // Poisoning is ignored: every recorder mutation is a single push or
    // assignment.
    recorder.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drain the subscription until the channel closes.
async fn react(
    mut subscription: Subscription,
    recorder: Arc<Mutex<SessionRecorder>>,
    processed: watch::Sender<u64>,
) {
    while let Some(event) = subscription.recv().await {
        let name = event.name.clone();
        let Some(reaction) = lock(&recorder).handle_event(event, Utc::now()) else {
            continue;
        };
        trace!(event = %name, ?reaction, "event handled");
        processed.send_modify(|seen| *seen = seen.saturating_add(1));
    }
    debug!("event channel closed, session logger no longer reacting");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use golmi_types::TimeOffset;
    use serde_json::json;

    use super::*;
    use crate::config::UploadConfig;

    fn attach(channel: &EventChannel, mode: LogMode) -> SessionLogger {
        let uploader = Uploader::new(&UploadConfig::default()).unwrap();
        SessionLogger::attach(channel, mode, uploader)
    }

    #[tokio::test]
    async fn attaching_subscribes_immediately() {
        let channel = EventChannel::new();
        let logger = attach(&channel, LogMode::Full);
        assert_eq!(channel.subscriber_count(), 1);
        assert!(logger.is_empty());
        assert!(!logger.is_started());
    }

    #[tokio::test]
    async fn reacts_to_channel_events() {
        let channel = EventChannel::new();
        let logger = attach(&channel, LogMode::Full);

        channel.emit_kind(EventKind::State, json!({"objs": {}, "grippers": {}}));
        channel.emit_kind(EventKind::State, json!({"objs": {"a": 1}, "grippers": {}}));
        logger.wait_for_events(2).await;

        assert_eq!(logger.len(), 1);
        assert!(logger.is_started());
        let first = logger.snapshots().into_iter().next().unwrap();
        assert_eq!(first.offset, TimeOffset::ZERO);
        assert_eq!(
            first.payload,
            json!({"objs": {"a": 1}, "grippers": {}, "config": {}})
        );
    }

    #[tokio::test]
    async fn unrelated_events_are_not_counted() {
        let channel = EventChannel::new();
        let logger = attach(&channel, LogMode::Delta);
        channel.emit("attach_gripper", json!("sid"));
        channel.emit_kind(EventKind::Config, json!({"width": 20}));
        logger.wait_for_events(1).await;
        assert_eq!(logger.events_processed(), 1);
        assert_eq!(logger.len(), 1);
    }

    #[tokio::test]
    async fn clear_keeps_subscription() {
        let channel = EventChannel::new();
        let logger = attach(&channel, LogMode::Delta);
        channel.emit_kind(EventKind::Config, json!({"width": 20}));
        logger.wait_for_events(1).await;
        logger.add_data("participant", json!("p-01")).unwrap();

        logger.clear();
        assert!(logger.is_empty());
        assert!(logger.data().is_empty());
        assert_eq!(logger.mode(), LogMode::Delta);

        channel.emit_kind(EventKind::Config, json!({"width": 30}));
        logger.wait_for_events(2).await;
        assert_eq!(logger.len(), 1);
    }

    #[tokio::test]
    async fn dropping_the_logger_unsubscribes() {
        let channel = EventChannel::new();
        let logger = attach(&channel, LogMode::Full);
        drop(logger);
        // The aborted task releases its queue once it is torn down.
        for _ in 0..100 {
            if channel.subscriber_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(channel.subscriber_count(), 0);
    }
}
