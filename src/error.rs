//! Error handling for the solar telemetry logger.

/// A specialized `Result` type for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// The main error type for acquisition, storage and dashboard operations.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Frame did not split into the expected number of fields, or was not text
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Voltage or current field was not a finite number
    #[error("Malformed number in field {field}: {value:?}")]
    MalformedNumber { field: usize, value: String },

    /// I/O failure on the serial source
    #[error("Serial fault: {0}")]
    SerialFault(String),

    /// Session log could not be read back
    #[error("Session log unavailable: {0}")]
    StoreUnavailable(String),

    /// Channel index outside the log schema
    #[error("Unknown channel index {0}")]
    UnknownChannel(usize),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),
}

impl TelemetryError {
    /// Create a new malformed frame error
    pub fn malformed_frame(msg: impl Into<String>) -> Self {
        Self::MalformedFrame(msg.into())
    }

    /// Create a new serial fault
    pub fn serial_fault(msg: impl Into<String>) -> Self {
        Self::SerialFault(msg.into())
    }

    /// Create a new store unavailable error
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Whether this error only affects a single frame.
    ///
    /// Per-frame errors are absorbed by the acquisition loop and never reach
    /// the store or the dashboard.
    pub fn is_frame_rejection(&self) -> bool {
        matches!(
            self,
            Self::MalformedFrame(_) | Self::MalformedNumber { .. }
        )
    }
}
