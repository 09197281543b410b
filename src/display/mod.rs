//! The display side of the pipeline.
//!
//! The acquisition loop never touches presentation state. It pushes events
//! into a bounded queue; [`run_dashboard`] drains that queue on its own tick,
//! applies the events to the shared [`DashboardState`] and fans the resulting
//! updates out to connected clients.

pub mod state;

pub use state::{DashboardState, DashboardUpdate};

use crate::acquisition::{AcquisitionEvent, EventReceiver, Reading, StopReason};
use crate::error::{Result, TelemetryError};
use crate::store::{HistoryPoint, HistoryReader};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc::error::TryRecvError, RwLock};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Consumer of acquisition events.
pub trait DisplaySink {
    /// A reading was accepted and logged.
    fn on_reading(&mut self, reading: &Reading);

    /// Acquisition has stopped for good.
    fn on_stopped(&mut self, reason: &StopReason);
}

/// Full history of a channel for the dashboard.
///
/// Channels that have not received a value yet answer like an unavailable
/// log, so the caller can show "no data available".
pub fn request_history(
    state: &DashboardState,
    reader: &HistoryReader,
    channel: usize,
) -> Result<Vec<HistoryPoint>> {
    if !reader.schema().is_channel(channel) {
        return Err(TelemetryError::UnknownChannel(channel));
    }
    if !state.history_enabled(channel) {
        return Err(TelemetryError::store_unavailable(format!(
            "no readings yet for channel {}",
            channel
        )));
    }
    reader.read_all(channel)
}

/// Drain the event queue every `tick` until the producer is gone.
pub async fn run_dashboard(
    mut events: EventReceiver,
    state: Arc<RwLock<DashboardState>>,
    updates: broadcast::Sender<DashboardUpdate>,
    tick: Duration,
) {
    let mut interval = time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let mut drained: Vec<AcquisitionEvent> = Vec::new();
        let closed = loop {
            match events.try_recv() {
                Ok(event) => drained.push(event),
                Err(TryRecvError::Empty) => break false,
                Err(TryRecvError::Disconnected) => break true,
            }
        };

        if !drained.is_empty() {
            let mut state = state.write().await;
            for event in &drained {
                let update = state.apply(event);
                if updates.send(update).is_err() {
                    debug!("No dashboard clients connected");
                }
            }
        }

        if closed {
            info!("Acquisition queue closed, dashboard keeps serving collected data");
            break;
        }
    }
}
