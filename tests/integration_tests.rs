use solar_logger::{
    event_channel, request_history, run_dashboard, spawn_acquisition, AcquisitionEvent,
    AcquisitionLoop, AcquisitionState, DashboardState, FrameParser, FrameSchema, SessionLog,
    StopHandle, StopReason, TelemetryError,
};
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::timeout;

const FRAME: &str = "1.0\t12.5\t2.0\t10\t5\t1\t90\t1000\t50\t40\t0\t0\n";

fn frame(voltage: f64, current: f64) -> String {
    format!("1.0\t{}\t{}\t10\t5\t1\t90\t1000\t50\t40\t0\t0\n", voltage, current)
}

/// Yields its bytes, then fails like an unplugged adapter.
struct FaultingSource {
    data: Cursor<Vec<u8>>,
}

impl Read for FaultingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged")),
            n => Ok(n),
        }
    }
}

#[tokio::test]
async fn test_valid_frame_is_logged_and_displayed() {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let schema = FrameSchema::default();
    let log = SessionLog::init_today(dir.path(), schema.clone()).expect("Should create log");
    let reader = log.reader();
    let (events, mut rx) = event_channel(16);

    let acquisition = AcquisitionLoop::new(
        Cursor::new(FRAME.as_bytes().to_vec()),
        FrameParser::default(),
        log,
        events,
        StopHandle::new(),
    );
    let report = spawn_acquisition(acquisition)
        .await
        .expect("Acquisition task should finish");

    assert_eq!(report.reason, StopReason::EndOfStream);
    assert_eq!(report.stats.accepted, 1);

    let reading = match rx.recv().await {
        Some(AcquisitionEvent::Reading(reading)) => reading,
        other => panic!("expected a reading, got {:?}", other),
    };
    let row = reading.row();
    assert_eq!(row.len(), 14);
    assert_eq!(&row[1..5], ["1.0", "12.5", "25.0", "2.0"]);
    assert!(matches!(rx.recv().await, Some(AcquisitionEvent::Stopped(_))));

    let contents = std::fs::read_to_string(reader.path()).expect("Should read log");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Timestamp\tAh\tVoltage (V)"));
    assert_eq!(lines[1], row.join("\t"));
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let log = SessionLog::init_today(dir.path(), FrameSchema::default()).expect("Should create log");
    let reader = log.reader();
    let (events, mut rx) = event_channel(16);

    let input = format!(
        "{}1.0\tX\t2.0\t10\t5\t1\t90\t1000\t50\t40\t0\t0\n1\t2\t3\n\n{}",
        FRAME,
        frame(13.0, 1.5)
    );
    let acquisition = AcquisitionLoop::new(
        Cursor::new(input.into_bytes()),
        FrameParser::default(),
        log,
        events,
        StopHandle::new(),
    );
    let report = spawn_acquisition(acquisition).await.unwrap();

    assert_eq!(report.stats.frames, 5);
    assert_eq!(report.stats.accepted, 2);
    assert_eq!(report.stats.rejected, 3);
    assert_eq!(reader.row_count().unwrap(), 2);

    let mut readings = 0;
    while let Some(event) = rx.recv().await {
        if let AcquisitionEvent::Reading(_) = event {
            readings += 1;
        }
    }
    assert_eq!(readings, 2);
}

#[tokio::test]
async fn test_history_returns_every_logged_value_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let schema = FrameSchema::default();
    let log = SessionLog::init_today(dir.path(), schema.clone()).unwrap();
    let reader = log.reader();
    let (events, rx) = event_channel(64);

    let input: String = (0..20).map(|i| frame(10.0 + i as f64, 2.0)).collect();
    let acquisition = AcquisitionLoop::new(
        Cursor::new(input.into_bytes()),
        FrameParser::default(),
        log,
        events,
        StopHandle::new(),
    );
    spawn_acquisition(acquisition).await.unwrap();

    let state = Arc::new(RwLock::new(DashboardState::new(&schema)));
    let (updates, _) = broadcast::channel(64);
    timeout(
        Duration::from_secs(5),
        run_dashboard(rx, state.clone(), updates, Duration::from_millis(5)),
    )
    .await
    .expect("Dashboard should finish once the queue closes");

    let state = state.read().await;
    assert_eq!(state.readings_received(), 20);

    let voltages = request_history(&state, &reader, 2).expect("Should read voltage history");
    let values: Vec<f64> = voltages.iter().filter_map(|p| p.numeric()).collect();
    let expected: Vec<f64> = (0..20).map(|i| 10.0 + i as f64).collect();
    assert_eq!(values, expected);

    let power = request_history(&state, &reader, 3).unwrap();
    assert_eq!(power.len(), 20);
    assert_eq!(power[0].value, "20.0");

    // Reading twice without new data gives the same answer.
    assert_eq!(request_history(&state, &reader, 2).unwrap(), voltages);
}

#[tokio::test]
async fn test_serial_fault_stops_but_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let schema = FrameSchema::default();
    let log = SessionLog::init_today(dir.path(), schema.clone()).unwrap();
    let reader = log.reader();
    let (events, mut rx) = event_channel(16);

    let input: String = (0..3).map(|_| FRAME.to_string()).collect();
    let acquisition = AcquisitionLoop::new(
        FaultingSource {
            data: Cursor::new(input.into_bytes()),
        },
        FrameParser::default(),
        log,
        events,
        StopHandle::new(),
    );
    let report = spawn_acquisition(acquisition).await.unwrap();

    assert!(matches!(report.reason, StopReason::SerialFault(_)));
    assert_eq!(report.stats.accepted, 3);

    let mut state = DashboardState::new(&schema);
    while let Some(event) = rx.recv().await {
        state.apply(&event);
    }
    assert!(state.latest().is_some());

    let history = request_history(&state, &reader, 1).unwrap();
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn test_dashboard_sees_fault_after_queue_overflow() {
    let dir = tempfile::tempdir().unwrap();
    let schema = FrameSchema::default();
    let log = SessionLog::init_today(dir.path(), schema.clone()).unwrap();
    let (events, rx) = event_channel(1);

    let input: String = (0..3).map(|_| FRAME.to_string()).collect();
    let acquisition = AcquisitionLoop::new(
        FaultingSource {
            data: Cursor::new(input.into_bytes()),
        },
        FrameParser::default(),
        log,
        events,
        StopHandle::new(),
    );

    let state = Arc::new(RwLock::new(DashboardState::new(&schema)));
    let (updates, _) = broadcast::channel(16);
    let handle = spawn_acquisition(acquisition);
    timeout(
        Duration::from_secs(5),
        run_dashboard(rx, state.clone(), updates, Duration::from_millis(20)),
    )
    .await
    .expect("Dashboard should finish once the queue closes");
    let report = handle.await.unwrap();

    let state = state.read().await;
    assert!(matches!(
        state.status(),
        AcquisitionState::Stopped(StopReason::SerialFault(_))
    ));
    assert_eq!(
        state.readings_received() + report.stats.events_dropped,
        report.stats.accepted
    );
}

#[tokio::test]
async fn test_interrupt_before_start() {
    let dir = tempfile::tempdir().unwrap();
    let log = SessionLog::init_today(dir.path(), FrameSchema::default()).unwrap();
    let (events, _rx) = event_channel(16);
    let stop = StopHandle::new();
    stop.raise();

    let acquisition = AcquisitionLoop::new(
        Cursor::new(FRAME.as_bytes().to_vec()),
        FrameParser::default(),
        log,
        events,
        stop,
    );
    let report = spawn_acquisition(acquisition).await.unwrap();

    assert_eq!(report.reason, StopReason::Interrupted);
    assert_eq!(report.stats.accepted, 0);
}

#[test]
fn test_history_unavailable_until_first_reading() {
    let dir = tempfile::tempdir().unwrap();
    let schema = FrameSchema::default();
    let log = SessionLog::init_today(dir.path(), schema.clone()).unwrap();
    let state = DashboardState::new(&schema);

    let err = request_history(&state, &log.reader(), 4).unwrap_err();
    assert!(matches!(err, TelemetryError::StoreUnavailable(_)));
}

#[test]
fn test_new_session_truncates_same_day_log() {
    let dir = tempfile::tempdir().unwrap();
    let schema = FrameSchema::default();
    let day = chrono::NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
    let parser = FrameParser::default();

    let mut first = SessionLog::init(dir.path(), day, schema.clone()).unwrap();
    first.append(&parser.parse(FRAME.as_bytes()).unwrap()).unwrap();
    assert_eq!(first.reader().row_count().unwrap(), 1);

    let second = SessionLog::init(dir.path(), day, schema.clone()).unwrap();
    assert_eq!(second.path(), first.path());
    assert_eq!(second.reader().row_count().unwrap(), 0);
    assert!(second.path().ends_with("serial_data_2024-07-04.csv"));
}
