//! Live status record with fan-out to connected observers.
//!
//! One record is shared by the whole process. Every update is pushed to all
//! current subscribers without waiting on any of them: a subscriber whose
//! buffer is full misses that update, and closed subscribers are pruned.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Duration token marking an elapsed-time display that keeps running
/// across consecutive updates.
pub const CONTINUING_TIMER: &str = "+pomo";

/// Updates buffered per subscriber before further ones are dropped
const SUBSCRIBER_BUFFER: usize = 16;

/// Snapshot of what is going on right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub started: DateTime<Utc>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl StatusRecord {
    fn idle() -> Self {
        Self {
            started: Utc::now(),
            action: "idle".to_string(),
            link: None,
            location: None,
            duration: None,
        }
    }
}

/// New values for the mutable fields of the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub action: String,
    pub link: Option<String>,
    pub location: Option<String>,
    pub duration: Option<String>,
}

impl StatusUpdate {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }
}

struct HubInner {
    record: StatusRecord,
    subscribers: HashMap<u64, mpsc::Sender<StatusRecord>>,
    next_id: u64,
}

/// Shared status record plus the set of live subscribers.
///
/// Cloning is cheap and every clone refers to the same record.
#[derive(Clone)]
pub struct StatusHub {
    inner: Arc<Mutex<HubInner>>,
}

impl Default for StatusHub {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                record: StatusRecord::idle(),
                subscribers: HashMap::new(),
                next_id: 1,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current snapshot
    pub fn read(&self) -> StatusRecord {
        self.lock().record.clone()
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Register a subscriber.
    ///
    /// The current snapshot is queued before the subscriber becomes visible
    /// to updates, so it always arrives first and nothing is missed in between.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let mut inner = self.lock();

        let id = inner.next_id;
        inner.next_id += 1;

        // Fresh channel with spare capacity: cannot fail
        let _ = tx.try_send(inner.record.clone());
        inner.subscribers.insert(id, tx);
        tracing::debug!("Subscriber {} connected ({} total)", id, inner.subscribers.len());

        Subscription {
            id,
            rx,
            hub: self.clone(),
        }
    }

    fn unsubscribe(&self, id: u64) {
        let mut inner = self.lock();
        if inner.subscribers.remove(&id).is_some() {
            tracing::debug!(
                "Subscriber {} disconnected ({} remaining)",
                id,
                inner.subscribers.len()
            );
        }
    }

    /// Replace the mutable fields and push the new snapshot to every subscriber.
    ///
    /// `started` resets to now unless both the previous and the new duration
    /// are the continuing-timer token.
    pub fn update(&self, update: StatusUpdate) -> StatusRecord {
        let mut inner = self.lock();

        let continuing = update.duration.as_deref() == Some(CONTINUING_TIMER)
            && inner.record.duration.as_deref() == Some(CONTINUING_TIMER);
        if !continuing {
            inner.record.started = Utc::now();
        }
        inner.record.action = update.action;
        inner.record.link = update.link;
        inner.record.location = update.location;
        inner.record.duration = update.duration;

        let snapshot = inner.record.clone();
        inner.subscribers.retain(|id, tx| match tx.try_send(snapshot.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("Subscriber {} is behind, dropping update", id);
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });

        tracing::info!(
            "Status is now '{}' ({} subscriber(s) notified)",
            snapshot.action,
            inner.subscribers.len()
        );
        snapshot
    }
}

/// A registered observer. Dropping it deregisters.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<StatusRecord>,
    hub: StatusHub,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next snapshot. The first one is the state at subscribe time.
    pub async fn recv(&mut self) -> Option<StatusRecord> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
