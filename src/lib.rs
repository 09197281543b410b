//! # Solar Logger - Serial Telemetry Logger
//!
//! Data acquisition and live display for the solar car sensor bus. Frames
//! arrive over a serial link as newline-terminated, tab-separated records;
//! every valid frame is logged to a dated session file and shown on a web
//! dashboard with per-channel history plots.
//!
//! ## Pipeline
//!
//! - **Frame parsing**: exact field-count validation, derived power column
//! - **Session log**: append-only, one tab-delimited file per day
//! - **Acquisition loop**: blocking reads with a 1 s timeout on a background thread
//! - **Dashboard**: drains a bounded queue on its own tick, serves HTTP + WebSocket
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use solar_logger::{
//!     event_channel, open_serial, spawn_acquisition, AcquisitionConfig, AcquisitionLoop,
//!     FrameParser, SessionLog, StopHandle,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AcquisitionConfig::default();
//!     let log = SessionLog::init_today(&config.log_dir, config.schema.clone())?;
//!     let parser = FrameParser::new(config.schema.clone())?;
//!     let (events, mut rx) = event_channel(config.event_capacity);
//!
//!     let port = open_serial(&config)?;
//!     let acquisition = AcquisitionLoop::new(port, parser, log, events, StopHandle::new());
//!     let handle = spawn_acquisition(acquisition);
//!
//!     while let Some(event) = rx.recv().await {
//!         println!("{:?}", event);
//!     }
//!     println!("{:?}", handle.await?);
//!     Ok(())
//! }
//! ```

pub mod acquisition;
pub mod display;
pub mod error;
pub mod schema;
pub mod store;
pub mod web;

// Re-export public API
pub use acquisition::{
    event_channel,
    source::{list_ports, open_replay, open_serial, PortInfo},
    spawn_acquisition, AcquisitionConfig, AcquisitionEvent, AcquisitionLoop, AcquisitionReport,
    AcquisitionState, AcquisitionStats, FrameParser, Reading, StopHandle, StopReason,
};
pub use display::{request_history, run_dashboard, DashboardState, DashboardUpdate, DisplaySink};
pub use error::{Result, TelemetryError};
pub use schema::{FrameSchema, COLUMN_LABELS, TRANSMITTED_FIELDS};
pub use store::{HistoryPoint, HistoryReader, SessionLog};
pub use web::{start_web_server, AppState, WebConfig};

/// The default serial device
pub const DEFAULT_DEVICE: &str = "/dev/ttyS0";

/// The default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// The default serial read timeout in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// The default dashboard drain tick in milliseconds
pub const DEFAULT_TICK_MS: u64 = 100;

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;
