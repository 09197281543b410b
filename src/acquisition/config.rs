//! Acquisition configuration.

use crate::schema::FrameSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the serial source and the session log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Serial device path
    pub device: String,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Read timeout in milliseconds; a timeout is not an error, the read is retried
    pub read_timeout_ms: u64,
    /// Directory the session log is written to
    pub log_dir: PathBuf,
    /// Capacity of the reading queue between acquisition and the dashboard
    pub event_capacity: usize,
    /// Frame and row layout
    pub schema: FrameSchema,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            device: crate::DEFAULT_DEVICE.to_string(),
            baud_rate: crate::DEFAULT_BAUD_RATE,
            read_timeout_ms: crate::DEFAULT_READ_TIMEOUT_MS,
            log_dir: PathBuf::from("."),
            event_capacity: 256,
            schema: FrameSchema::default(),
        }
    }
}

impl AcquisitionConfig {
    /// Create a configuration for a specific device.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the read timeout in milliseconds.
    pub fn with_read_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.read_timeout_ms = timeout_ms;
        self
    }

    /// Set the session log directory.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Set the reading queue capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Set the frame schema.
    pub fn with_schema(mut self, schema: FrameSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Read timeout as a `Duration`.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_sensor_bus() {
        let config = AcquisitionConfig::default();
        assert_eq!(config.device, "/dev/ttyS0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.schema.transmitted_fields, 12);
    }

    #[test]
    fn test_builder() {
        let config = AcquisitionConfig::new("/dev/ttyUSB0")
            .with_baud_rate(115_200)
            .with_read_timeout_ms(250)
            .with_log_dir("/tmp/logs")
            .with_event_capacity(0);
        assert_eq!(config.device, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.read_timeout_ms, 250);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/logs"));
        assert_eq!(config.event_capacity, 1);
    }
}
