//! Telemetry acquisition from the serial sensor bus.
//!
//! This module turns the raw serial byte stream into validated readings:
//! line framing with a bounded read timeout, frame validation and decoding,
//! persistence to the session log, and hand-off to the display through a
//! non-blocking queue.

pub mod config;
pub mod data;
pub mod events;
pub mod parser;
pub mod source;
pub mod worker;

// Re-export commonly used items
pub use config::AcquisitionConfig;
pub use data::Reading;
pub use events::{event_channel, AcquisitionEvent, EventReceiver, EventSender, StopHandle, StopReason};
pub use parser::FrameParser;
pub use worker::{spawn_acquisition, AcquisitionLoop, AcquisitionReport, AcquisitionState, AcquisitionStats};
