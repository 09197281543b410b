//! Events emitted by the acquisition loop towards the display.

use crate::acquisition::data::Reading;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Why the acquisition loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    /// Operator interrupt
    Interrupted,
    /// Unrecoverable I/O error on the serial source
    SerialFault(String),
    /// The source reported end of stream
    EndOfStream,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrupted => write!(f, "interrupted by operator"),
            Self::SerialFault(detail) => write!(f, "serial fault: {}", detail),
            Self::EndOfStream => write!(f, "end of stream"),
        }
    }
}

/// Notification pushed from the acquisition loop to the display.
#[derive(Debug, Clone)]
pub enum AcquisitionEvent {
    /// A reading was accepted and appended to the session log
    Reading(Reading),
    /// The loop has stopped and released the serial source
    Stopped(StopReason),
}

/// Producer side of the reading queue.
///
/// Publishing never waits: when the queue is full the event is dropped.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<AcquisitionEvent>,
    dropped: Arc<AtomicU64>,
}

/// Consumer side of the reading queue.
pub type EventReceiver = mpsc::Receiver<AcquisitionEvent>;

/// Create a bounded reading queue.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventSender {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

impl EventSender {
    /// Queue an event without blocking. Returns whether it was queued.
    pub fn publish(&self, event: AcquisitionEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("Display queue full, dropped event ({} total)", total);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Display queue closed, event discarded");
                false
            }
        }
    }

    /// Queue an event, waiting for room if the queue is full.
    ///
    /// Only for the final event of a finished producer. Must be called from
    /// a blocking thread, never from inside the async runtime.
    pub fn deliver(&self, event: AcquisitionEvent) -> bool {
        match self.tx.blocking_send(event) {
            Ok(()) => true,
            Err(_) => {
                debug!("Display queue closed, event discarded");
                false
            }
        }
    }

    /// Events dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Operator interrupt shared between the signal handler and the loop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    raised: Arc<AtomicBool>,
}

impl StopHandle {
    /// Create a handle in the not-raised state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop. It notices within one read timeout.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
