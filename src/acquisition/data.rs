//! Data structures for decoded telemetry.

use chrono::{DateTime, Local, SubsecRound};
use serde::{Deserialize, Serialize};

/// Format used for the timestamp column of the session log and the dashboard.
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S";

/// One validated, timestamped sensor record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Local time the frame was received, truncated to whole seconds
    pub timestamp: DateTime<Local>,
    /// Row columns after the timestamp, in log order
    pub channels: Vec<String>,
    /// Derived power, `round(current * voltage, 2)`
    pub power: f64,
}

impl Reading {
    /// Build a reading, truncating the timestamp to second resolution.
    pub fn new(timestamp: DateTime<Local>, channels: Vec<String>, power: f64) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(0),
            channels,
            power,
        }
    }

    /// Timestamp as written to the log.
    pub fn timestamp_label(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Value of a row column; column 0 is the timestamp.
    pub fn column(&self, index: usize) -> Option<String> {
        match index {
            0 => Some(self.timestamp_label()),
            i => self.channels.get(i - 1).cloned(),
        }
    }

    /// The full log row, timestamp first.
    pub fn row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(self.channels.len() + 1);
        row.push(self.timestamp_label());
        row.extend(self.channels.iter().cloned());
        row
    }

    /// Number of row columns, timestamp included.
    pub fn width(&self) -> usize {
        self.channels.len() + 1
    }
}

/// Round to two decimals, ties to even on the exact binary value.
///
/// Matches the logger's historical output: `0.125` becomes `0.12`, while
/// `2.675` (stored just below the tie) becomes `2.67`.
pub fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Render a derived value the way the log has always shown it: integral
/// values keep one decimal (`25.0`), everything else uses the shortest exact
/// decimal (`24.69`).
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
