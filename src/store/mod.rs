//! Persistence of accepted readings.
//!
//! Readings are appended to a day-scoped session log by the acquisition loop
//! and read back in full by the dashboard when a channel history is requested.

pub mod session_log;

pub use session_log::{log_file_name, HistoryPoint, HistoryReader, SessionLog};
