//! Channel layout shared by the parser, the session log and the dashboard.

use crate::error::{Result, TelemetryError};
use serde::{Deserialize, Serialize};

/// Column names of the session log, in row order.
pub const COLUMN_LABELS: [&str; 14] = [
    "Timestamp",
    "Ah",
    "Voltage (V)",
    "Current (A)",
    "Power (Watt)",
    "Speed (m/s)",
    "Distance (m)",
    "Degree (°)",
    "RPM (Rounds/Minute)",
    "Throttle Out",
    "Throttle In",
    "AuxA",
    "AuxD",
    "Flgs",
];

/// Number of tab-separated fields the sensor bus transmits per frame.
pub const TRANSMITTED_FIELDS: usize = 12;

/// Layout of a frame and of the row it becomes.
///
/// A row is `[timestamp, f0, .., fN]` with the derived power column inserted
/// at `power_column`. The deployed bus layout puts power right after the
/// first two transmitted fields, i.e. `[timestamp, f0, f1, power, f2, ..]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSchema {
    /// Fields a frame must split into to be accepted
    pub transmitted_fields: usize,
    /// Index of the voltage field within the transmitted fields
    pub voltage_field: usize,
    /// Index of the current field within the transmitted fields
    pub current_field: usize,
    /// Row column the derived power value is inserted at
    pub power_column: usize,
    /// Column names, timestamp first
    pub columns: Vec<String>,
}

impl Default for FrameSchema {
    fn default() -> Self {
        Self {
            transmitted_fields: TRANSMITTED_FIELDS,
            voltage_field: 1,
            current_field: 2,
            power_column: 3,
            columns: COLUMN_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FrameSchema {
    /// Override the number of transmitted fields.
    ///
    /// Extra fields get generic `FieldN` column names; a smaller count drops
    /// trailing columns.
    pub fn with_transmitted_fields(mut self, count: usize) -> Self {
        let width = count + 2;
        self.columns.truncate(width);
        while self.columns.len() < width {
            let n = self.columns.len();
            self.columns.push(format!("Field{}", n));
        }
        self.transmitted_fields = count;
        self
    }

    /// Number of columns in a log row, timestamp included.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Name of a column, if it exists.
    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    /// Whether `index` addresses a plottable channel (any column but the timestamp).
    pub fn is_channel(&self, index: usize) -> bool {
        index >= 1 && index < self.width()
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.columns.len() != self.transmitted_fields + 2 {
            return Err(TelemetryError::config_error(format!(
                "{} columns do not fit {} transmitted fields plus timestamp and power",
                self.columns.len(),
                self.transmitted_fields
            )));
        }
        if self.voltage_field >= self.transmitted_fields
            || self.current_field >= self.transmitted_fields
        {
            return Err(TelemetryError::config_error(
                "voltage/current field index outside the frame",
            ));
        }
        if self.power_column < 1 || self.power_column > self.transmitted_fields + 1 {
            return Err(TelemetryError::config_error(format!(
                "power column {} outside the row",
                self.power_column
            )));
        }
        Ok(())
    }
}
