//! The acquisition loop.
//!
//! Owns the serial source and the append side of the session log. Reads one
//! line at a time with a bounded timeout, validates it, appends accepted
//! readings to the log and then pushes them to the display queue.
//!
//! State machine:
//!
//! ```text
//!   Running --(operator interrupt)------> Stopped(Interrupted)
//!   Running --(serial I/O error)--------> Stopped(SerialFault)
//!   Running --(source end of stream)----> Stopped(EndOfStream)
//! ```
//!
//! A read timeout is not a transition; the read is simply retried.

use crate::acquisition::events::{AcquisitionEvent, EventSender, StopHandle, StopReason};
use crate::acquisition::parser::FrameParser;
use crate::store::SessionLog;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufReader, Read};
use tokio::task::JoinHandle;

/// Longest line accepted as a frame. Longer runs without a newline are noise.
pub const MAX_FRAME_BYTES: usize = 4096;
use tracing::{debug, error, info, warn};

/// Current state of the loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum AcquisitionState {
    /// Reading frames
    Running,
    /// Stopped for good; the loop never restarts itself
    Stopped(StopReason),
}

/// Frame counters kept by the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionStats {
    /// Complete lines read from the source
    pub frames: u64,
    /// Frames that became readings and were logged
    pub accepted: u64,
    /// Frames dropped by the parser
    pub rejected: u64,
    /// Readings that could not be appended to the log
    pub store_failures: u64,
    /// Display events dropped because the queue was full
    pub events_dropped: u64,
}

/// Outcome of a finished loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionReport {
    pub reason: StopReason,
    pub stats: AcquisitionStats,
}

/// Single-producer acquisition loop over any byte source.
pub struct AcquisitionLoop<R: Read> {
    source: Option<BufReader<R>>,
    parser: FrameParser,
    log: SessionLog,
    events: EventSender,
    stop: StopHandle,
    state: AcquisitionState,
    stats: AcquisitionStats,
}

impl<R: Read> AcquisitionLoop<R> {
    /// Build a loop. It starts in the `Running` state.
    pub fn new(
        source: R,
        parser: FrameParser,
        log: SessionLog,
        events: EventSender,
        stop: StopHandle,
    ) -> Self {
        Self {
            source: Some(BufReader::new(source)),
            parser,
            log,
            events,
            stop,
            state: AcquisitionState::Running,
            stats: AcquisitionStats::default(),
        }
    }

    /// Current state.
    pub fn state(&self) -> &AcquisitionState {
        &self.state
    }

    /// Counters so far.
    pub fn stats(&self) -> AcquisitionStats {
        self.stats
    }

    /// Run until interrupted, faulted or out of input.
    ///
    /// The source is released before the final `Stopped` event is emitted.
    pub fn run(&mut self) -> AcquisitionReport {
        if let AcquisitionState::Stopped(reason) = &self.state {
            return AcquisitionReport {
                reason: reason.clone(),
                stats: self.stats,
            };
        }

        info!("Acquisition loop running");
        let reason = self.read_frames();

        self.source = None;
        self.state = AcquisitionState::Stopped(reason.clone());

        match &reason {
            StopReason::SerialFault(detail) => error!("Acquisition stopped: serial fault: {}", detail),
            other => info!("Acquisition stopped: {}", other),
        }
        info!(
            "Frames: {} read, {} accepted, {} rejected, {} rows in {}",
            self.stats.frames,
            self.stats.accepted,
            self.stats.rejected,
            self.log.rows_appended(),
            self.log.path().display()
        );

        // The stop must reach the display even when readings were dropped.
        if !self.events.deliver(AcquisitionEvent::Stopped(reason.clone())) {
            warn!("Display gone before the stop could be reported");
        }
        self.stats.events_dropped = self.events.dropped();

        AcquisitionReport {
            reason,
            stats: self.stats,
        }
    }

    fn read_frames(&mut self) -> StopReason {
        let Some(mut source) = self.source.take() else {
            return StopReason::EndOfStream;
        };
        // Bytes of an unfinished line survive read timeouts.
        let mut line: Vec<u8> = Vec::with_capacity(256);
        // Set while skipping the rest of an oversized line.
        let mut discarding = false;

        let reason = loop {
            if self.stop.is_raised() {
                break StopReason::Interrupted;
            }

            let room = (MAX_FRAME_BYTES + 1).saturating_sub(line.len()) as u64;
            match source.by_ref().take(room).read_until(b'\n', &mut line) {
                Ok(0) => {
                    if !line.is_empty() && !discarding {
                        self.handle_frame(&line);
                    }
                    line.clear();
                    break StopReason::EndOfStream;
                }
                Ok(_) if line.last() == Some(&b'\n') => {
                    if !discarding {
                        self.handle_frame(&line);
                    }
                    discarding = false;
                    line.clear();
                }
                Ok(_) if line.len() > MAX_FRAME_BYTES => {
                    if !discarding {
                        self.stats.frames += 1;
                        self.stats.rejected += 1;
                        warn!("Dropped frame: no newline within {} bytes", MAX_FRAME_BYTES);
                        discarding = true;
                    }
                    line.clear();
                }
                // Unterminated data: the next read completes the line or hits end of stream.
                Ok(_) => {}
                Err(e) if is_timeout(&e) => {
                    debug!("Serial read timed out, {} bytes pending", line.len());
                }
                Err(e) => break StopReason::SerialFault(e.to_string()),
            }
        };

        self.source = Some(source);
        reason
    }

    fn handle_frame(&mut self, raw: &[u8]) {
        self.stats.frames += 1;

        let reading = match self.parser.parse(raw) {
            Ok(reading) => reading,
            Err(e) if e.is_frame_rejection() => {
                self.stats.rejected += 1;
                debug!("Dropped frame: {}", e);
                return;
            }
            Err(e) => {
                self.stats.rejected += 1;
                warn!("Frame could not be decoded: {}", e);
                return;
            }
        };

        if let Err(e) = self.log.append(&reading) {
            self.stats.store_failures += 1;
            error!("Failed to append reading to {}: {}", self.log.path().display(), e);
            return;
        }

        self.stats.accepted += 1;
        if !self.events.publish(AcquisitionEvent::Reading(reading)) {
            warn!("Reading {} not delivered to the display", self.stats.accepted);
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Run the loop on the blocking thread pool.
pub fn spawn_acquisition<R>(mut acquisition: AcquisitionLoop<R>) -> JoinHandle<AcquisitionReport>
where
    R: Read + Send + 'static,
{
    tokio::task::spawn_blocking(move || acquisition.run())
}
