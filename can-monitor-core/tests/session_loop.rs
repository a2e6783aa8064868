//! End-to-end session loop tests: discovery round-trip, logging mode with
//! an allow-list, and cancellation while the bus is silent.

use can_monitor_core::{
    ByteOrder, CancelFlag, Catalog, FirstSighting, FlushOutcome, FrameSource, MessageLayout,
    NullObserver, RawFrame, ReplaySource, SessionConfig, SessionLoop, SessionMode, SessionPhase,
    SightingObserver, SignalLayout, SourceError, StopReason, ValueKind,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn signal(name: &str, start_bit: u16, bit_width: u16) -> SignalLayout {
    SignalLayout {
        name: name.to_string(),
        start_bit,
        bit_width,
        byte_order: ByteOrder::LittleEndian,
        value_kind: ValueKind::Unsigned,
        scale: 1.0,
        offset: 0.0,
        min: None,
        max: None,
        unit: None,
        multiplex: None,
    }
}

fn catalog() -> Catalog {
    Catalog::new(
        "testcat",
        vec![
            MessageLayout {
                id: 0x100,
                is_extended: false,
                name: "A".to_string(),
                byte_length: 8,
                signals: vec![signal("x", 0, 8), signal("y", 8, 8)],
            },
            MessageLayout {
                id: 0x200,
                is_extended: false,
                name: "B".to_string(),
                byte_length: 8,
                signals: vec![signal("z", 0, 16)],
            },
        ],
    )
    .unwrap()
}

fn frame(can_id: u32, data: Vec<u8>, timestamp_ns: u64) -> RawFrame {
    RawFrame {
        can_id,
        is_extended: false,
        data,
        timestamp_ns,
    }
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    entries.sort();
    entries
}

/// Collects first sightings for assertions
#[derive(Default)]
struct RecordingObserver {
    sightings: Vec<FirstSighting>,
}

impl SightingObserver for RecordingObserver {
    fn on_first_sighting(&mut self, sighting: &FirstSighting) {
        self.sightings.push(sighting.clone());
    }
}

#[test]
fn discovery_round_trip_produces_matching_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::new(SessionMode::Discovery, dir.path());
    let mut session = SessionLoop::new(catalog(), config);

    let mut source = ReplaySource::new(vec![
        frame(0x100, vec![1, 2, 0, 0, 0, 0, 0, 0], 1),
        frame(0x200, vec![3, 4, 0, 0, 0, 0, 0, 0], 2),
        // Repeats must not change the inventory
        frame(0x100, vec![9, 9, 0, 0, 0, 0, 0, 0], 3),
    ]);

    let mut observer = RecordingObserver::default();
    let summary = session
        .run(&mut source, &CancelFlag::new(), &mut observer)
        .unwrap();

    assert_eq!(summary.unique_messages, 2);
    assert_eq!(summary.rows_logged, 0);
    assert_eq!(summary.stop_reason, StopReason::SourceExhausted);

    // First sightings fired exactly once per message, in arrival order
    let names: Vec<&str> = observer
        .sightings
        .iter()
        .map(|s| s.message_name.as_str())
        .collect();
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(observer.sightings[0].arbitration_id, 0x100);
    assert_eq!(observer.sightings[0].byte_length, 8);

    // Two files: CSV and JSON with identical message/signal content
    let flush = summary.flush.unwrap();
    assert_eq!(flush.files().len(), 2);
    assert_eq!(files_in(dir.path()).len(), 2);

    let csv = std::fs::read_to_string(&flush.files()[0]).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines, vec!["MessageName,SignalNames", "A,x;y", "B,z"]);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&flush.files()[1]).unwrap()).unwrap();
    assert_eq!(json["A"], serde_json::json!(["x", "y"]));
    assert_eq!(json["B"], serde_json::json!(["z"]));
}

#[test]
fn logging_mode_applies_allow_list_and_writes_rows() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::new(SessionMode::Logging, dir.path())
        .with_signal_filter(vec!["x".to_string(), "z".to_string()]);
    let mut session = SessionLoop::new(catalog(), config);

    let mut source = ReplaySource::new(vec![
        frame(0x100, vec![42, 7, 0, 0, 0, 0, 0, 0], 1_000_000_000_000_000),
        frame(0x200, vec![0x10, 0x00, 0, 0, 0, 0, 0, 0], 2_000_000_000_000_000),
    ]);

    let summary = session
        .run(&mut source, &CancelFlag::new(), &mut NullObserver)
        .unwrap();
    assert_eq!(summary.rows_logged, 2);

    let flush = summary.flush.unwrap();
    assert_eq!(flush.files().len(), 1);
    let content = std::fs::read_to_string(&flush.files()[0]).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    // "y" is filtered out and never becomes a column
    assert_eq!(lines[0], "timestamp,arbitration_id,x,z");
    assert_eq!(lines[1], "1000000.000000,0x100,42,");
    assert_eq!(lines[2], "2000000.000000,0x200,,16");
}

/// Silent source that requests cancellation from its first poll
struct SilentSource {
    cancel: CancelFlag,
    polls: u32,
}

impl FrameSource for SilentSource {
    fn next_frame(&mut self, _timeout: Duration) -> Result<Option<RawFrame>, SourceError> {
        self.polls += 1;
        self.cancel.trigger();
        Ok(None)
    }
}

#[test]
fn cancellation_while_source_is_idle_stops_within_one_poll() {
    let dir = tempfile::tempdir().unwrap();
    let config =
        SessionConfig::new(SessionMode::Discovery, dir.path()).with_poll_timeout_ms(10);
    let mut session = SessionLoop::new(catalog(), config);

    let cancel = CancelFlag::new();
    let mut source = SilentSource {
        cancel: cancel.clone(),
        polls: 0,
    };

    let summary = session.run(&mut source, &cancel, &mut NullObserver).unwrap();
    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(source.polls, 1);
    assert_eq!(session.phase(), SessionPhase::Stopped);

    // Nothing was observed, so the single flush wrote no files
    assert!(matches!(summary.flush.unwrap(), FlushOutcome::NothingToWrite));
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn source_device_error_is_an_implicit_stop() {
    struct FailingSource;
    impl FrameSource for FailingSource {
        fn next_frame(&mut self, _timeout: Duration) -> Result<Option<RawFrame>, SourceError> {
            Err(SourceError::Device("bus off".to_string()))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::new(SessionMode::Logging, dir.path());
    let mut session = SessionLoop::new(catalog(), config);

    let summary = session
        .run(&mut FailingSource, &CancelFlag::new(), &mut NullObserver)
        .unwrap();
    assert_eq!(
        summary.stop_reason,
        StopReason::SourceError("frame source device error: bus off".to_string())
    );
    assert_eq!(session.phase(), SessionPhase::Stopped);
}
