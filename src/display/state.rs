//! Dashboard state owned by the presentation side.

use crate::acquisition::{AcquisitionEvent, AcquisitionState, Reading, StopReason};
use crate::display::DisplaySink;
use crate::schema::FrameSchema;
use serde::Serialize;

/// Message pushed to dashboard clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardUpdate {
    /// Full state, sent when a client connects
    Snapshot {
        columns: Vec<String>,
        row: Option<Vec<String>>,
        history_enabled: Vec<bool>,
        status: AcquisitionState,
        readings_received: u64,
    },
    /// A new reading arrived
    Reading {
        row: Vec<String>,
        history_enabled: Vec<bool>,
    },
    /// Acquisition stopped; the dashboard keeps serving collected data
    Stopped { reason: StopReason },
}

/// Latest values and per-channel history availability.
#[derive(Debug, Clone)]
pub struct DashboardState {
    columns: Vec<String>,
    latest: Option<Reading>,
    history_enabled: Vec<bool>,
    status: AcquisitionState,
    readings_received: u64,
}

impl DashboardState {
    /// Empty state for a schema: no values, every history button disabled.
    pub fn new(schema: &FrameSchema) -> Self {
        Self {
            columns: schema.columns.clone(),
            latest: None,
            history_enabled: vec![false; schema.width()],
            status: AcquisitionState::Running,
            readings_received: 0,
        }
    }

    /// Most recent reading, if any.
    pub fn latest(&self) -> Option<&Reading> {
        self.latest.as_ref()
    }

    /// Whether history can be requested for a row column.
    pub fn history_enabled(&self, channel: usize) -> bool {
        self.history_enabled.get(channel).copied().unwrap_or(false)
    }

    /// Acquisition status as last reported.
    pub fn status(&self) -> &AcquisitionState {
        &self.status
    }

    /// Readings received since start.
    pub fn readings_received(&self) -> u64 {
        self.readings_received
    }

    /// Column names, timestamp first.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Apply one event and return the update to broadcast.
    pub fn apply(&mut self, event: &AcquisitionEvent) -> DashboardUpdate {
        match event {
            AcquisitionEvent::Reading(reading) => {
                self.on_reading(reading);
                DashboardUpdate::Reading {
                    row: reading.row(),
                    history_enabled: self.history_enabled.clone(),
                }
            }
            AcquisitionEvent::Stopped(reason) => {
                self.on_stopped(reason);
                DashboardUpdate::Stopped {
                    reason: reason.clone(),
                }
            }
        }
    }

    /// Full state as a client message.
    pub fn snapshot(&self) -> DashboardUpdate {
        DashboardUpdate::Snapshot {
            columns: self.columns.clone(),
            row: self.latest.as_ref().map(Reading::row),
            history_enabled: self.history_enabled.clone(),
            status: self.status.clone(),
            readings_received: self.readings_received,
        }
    }
}

impl DisplaySink for DashboardState {
    fn on_reading(&mut self, reading: &Reading) {
        // Column 0 is the timestamp and never gets a history.
        for (index, enabled) in self.history_enabled.iter_mut().enumerate().skip(1) {
            if index < reading.width() {
                *enabled = true;
            }
        }
        self.readings_received += 1;
        self.latest = Some(reading.clone());
    }

    fn on_stopped(&mut self, reason: &StopReason) {
        self.status = AcquisitionState::Stopped(reason.clone());
    }
}
