//! Day-scoped, append-only session log.
//!
//! The log is a tab-delimited file with one header row naming the columns
//! followed by one row per accepted reading. Every append opens the file in
//! append mode, writes the whole row with a single write, syncs and closes,
//! so a concurrent reader never observes a partial row.

use crate::acquisition::data::Reading;
use crate::error::{Result, TelemetryError};
use crate::schema::FrameSchema;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the session log for a given day.
pub fn log_file_name(day: NaiveDate) -> String {
    format!("serial_data_{}.csv", day.format("%Y-%m-%d"))
}

/// One stored value of a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Timestamp column of the row
    pub timestamp: String,
    /// Channel value as stored
    pub value: String,
}

impl HistoryPoint {
    /// The value as a number, if it is one.
    pub fn numeric(&self) -> Option<f64> {
        self.value.trim().parse().ok()
    }
}

/// Append side of the session log. Owned by the acquisition loop.
#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    schema: FrameSchema,
    rows: u64,
}

impl SessionLog {
    /// Create the log for `day` inside `dir`, overwriting any log of the same
    /// name, and write the header row.
    pub fn init(dir: &Path, day: NaiveDate, schema: FrameSchema) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Self::create(dir.join(log_file_name(day)), schema)
    }

    /// Create the log for today's date.
    pub fn init_today(dir: &Path, schema: FrameSchema) -> Result<Self> {
        Self::init(dir, Local::now().date_naive(), schema)
    }

    /// Create a log at an explicit path and write the header row.
    pub fn create(path: impl Into<PathBuf>, schema: FrameSchema) -> Result<Self> {
        let path = path.into();
        let header = encode_row(schema.columns.as_slice())?;

        let mut file = File::create(&path)?;
        file.write_all(&header)?;
        file.sync_data()?;

        info!("Session log created at {}", path.display());
        Ok(Self {
            path,
            schema,
            rows: 0,
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended through this handle.
    pub fn rows_appended(&self) -> u64 {
        self.rows
    }

    /// Append one reading. The row is on disk when this returns.
    pub fn append(&mut self, reading: &Reading) -> Result<()> {
        if reading.width() != self.schema.width() {
            return Err(TelemetryError::config_error(format!(
                "reading has {} columns, log has {}",
                reading.width(),
                self.schema.width()
            )));
        }

        let row = encode_row(reading.row().as_slice())?;
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(&row)?;
        file.flush()?;
        file.sync_data()?;

        self.rows += 1;
        debug!("Appended row {} to {}", self.rows, self.path.display());
        Ok(())
    }

    /// A read-only view of this log for history requests.
    pub fn reader(&self) -> HistoryReader {
        HistoryReader {
            path: self.path.clone(),
            schema: self.schema.clone(),
        }
    }

    /// Full history of one channel.
    pub fn read_all(&self, channel: usize) -> Result<Vec<HistoryPoint>> {
        self.reader().read_all(channel)
    }
}

/// Read side of the session log. Never writes.
#[derive(Debug, Clone)]
pub struct HistoryReader {
    path: PathBuf,
    schema: FrameSchema,
}

impl HistoryReader {
    /// Open a reader over an existing log file.
    pub fn open(path: impl Into<PathBuf>, schema: FrameSchema) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema used to address channels.
    pub fn schema(&self) -> &FrameSchema {
        &self.schema
    }

    /// Every stored `(timestamp, value)` of `channel`, in file order.
    ///
    /// `channel` is a row column index; column 0 is the timestamp itself and
    /// is not a channel.
    pub fn read_all(&self, channel: usize) -> Result<Vec<HistoryPoint>> {
        if !self.schema.is_channel(channel) {
            return Err(TelemetryError::UnknownChannel(channel));
        }

        let mut points = Vec::new();
        for record in self.data_rows()? {
            match (record.get(0), record.get(channel)) {
                (Some(timestamp), Some(value)) => points.push(HistoryPoint {
                    timestamp: timestamp.to_string(),
                    value: value.to_string(),
                }),
                _ => warn!(
                    "Skipping short row ({} columns) in {}",
                    record.len(),
                    self.path.display()
                ),
            }
        }
        Ok(points)
    }

    /// Number of data rows in the log.
    pub fn row_count(&self) -> Result<usize> {
        Ok(self.data_rows()?.len())
    }

    fn data_rows(&self) -> Result<Vec<csv::StringRecord>> {
        let unavailable = |e: &dyn std::fmt::Display| {
            TelemetryError::store_unavailable(format!("{}: {}", self.path.display(), e))
        };

        let file = File::open(&self.path).map_err(|e| unavailable(&e))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut records = reader.records();
        match records.next() {
            Some(Ok(_header)) => {}
            Some(Err(e)) => return Err(unavailable(&e)),
            None => return Err(unavailable(&"no header row")),
        }

        let mut rows = Vec::new();
        for record in records {
            match record {
                Ok(record) => rows.push(record),
                Err(e) if e.is_io_error() => return Err(unavailable(&e)),
                Err(e) => warn!("Skipping unreadable row in {}: {}", self.path.display(), e),
            }
        }
        Ok(rows)
    }
}

fn encode_row<S: AsRef<[u8]>>(fields: &[S]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(Vec::with_capacity(128));
    writer
        .write_record(fields)
        .map_err(|e| TelemetryError::Io(e.into()))?;
    writer
        .into_inner()
        .map_err(|e| TelemetryError::Io(e.into_error()))
}
