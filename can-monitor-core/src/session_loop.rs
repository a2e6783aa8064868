//! Session loop
//!
//! Orchestrates catalog lookup, decoding, first-sighting tracking,
//! filtering and sink buffering under cooperative cancellation:
//!
//! `Idle -> Running -> Stopping -> Stopped`
//!
//! A lookup miss or a decode error is a per-frame soft failure: the frame
//! is dropped, a counter increments and the loop continues. The loop
//! stops on cancellation or a terminal source condition, flushes the
//! mode's sink exactly once, and is then terminal; construct a new loop
//! for a new session.

use crate::cancel::CancelFlag;
use crate::catalog::{Catalog, MessageLayout};
use crate::config::{SessionConfig, SessionMode};
use crate::filter::SignalFilter;
use crate::frame_decoder::FrameDecoder;
use crate::session::{FirstSighting, MessageInventory, SessionTracker, SightingObserver};
use crate::sink::{DiscoverySink, FlushOutcome, RowSink};
use crate::source::FrameSource;
use crate::types::{DecodedRow, PhysicalValue, RawFrame, SessionError, SinkError, SourceError};
use std::collections::HashMap;

/// Lifecycle phase of a session loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Constructed, not yet run
    Idle,
    /// Pulling and decoding frames
    Running,
    /// Stop requested; flushing
    Stopping,
    /// Terminal; the loop cannot be restarted
    Stopped,
}

/// Why the loop left `Running`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation flag was triggered
    Cancelled,
    /// The frame source ran out of frames
    SourceExhausted,
    /// The frame source reported a terminal device error
    SourceError(String),
}

/// End-of-session report
#[derive(Debug)]
pub struct SessionSummary {
    /// Frames pulled from the source
    pub frames_received: u64,
    /// Frames that decoded successfully
    pub frames_decoded: u64,
    /// Rows buffered for the row sink (logging mode)
    pub rows_logged: u64,
    /// Frames dropped due to decode errors
    pub decode_errors: u64,
    /// Frames whose arbitration id had no catalog entry
    pub lookup_misses: u64,
    /// Distinct message names observed
    pub unique_messages: usize,
    /// Why the session stopped
    pub stop_reason: StopReason,
    /// Flush result; a failure leaves the buffered data on the loop
    /// object for an alternate persistence path
    pub flush: Result<FlushOutcome, SinkError>,
}

/// A single monitoring session over one frame source
pub struct SessionLoop {
    catalog: Catalog,
    config: SessionConfig,
    tracker: SessionTracker,
    filter: SignalFilter,
    row_sink: RowSink,
    discovery_sink: DiscoverySink,
    phase: SessionPhase,
    frames_received: u64,
    frames_decoded: u64,
    decode_errors: u64,
    lookup_misses: u64,
}

impl SessionLoop {
    /// Create a session loop over an already-validated catalog
    pub fn new(catalog: Catalog, config: SessionConfig) -> Self {
        let filter = SignalFilter::new(config.signal_filter.clone());
        let discovery_sink = DiscoverySink::new(catalog.source());
        Self {
            catalog,
            config,
            tracker: SessionTracker::new(),
            filter,
            row_sink: RowSink::new(),
            discovery_sink,
            phase: SessionPhase::Idle,
            frames_received: 0,
            frames_decoded: 0,
            decode_errors: 0,
            lookup_misses: 0,
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Rows buffered so far (available for retry after a failed flush)
    pub fn rows(&self) -> &[DecodedRow] {
        self.row_sink.rows()
    }

    /// Discovery inventory captured so far
    pub fn inventory(&self) -> &[MessageInventory] {
        self.tracker.inventory()
    }

    /// Run the session until cancelled or the source terminates
    ///
    /// Fails with `SessionError::NotRestartable` if the loop has already
    /// run. The cancellation flag is polled once per iteration and after
    /// every wait timeout, so a stop request while the bus is silent
    /// takes effect within one poll-timeout interval. The sink flush runs
    /// exactly once, during `Stopping`; a flush error is reported in the
    /// summary and does not re-enter `Running`.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        cancel: &CancelFlag,
        observer: &mut dyn SightingObserver,
    ) -> Result<SessionSummary, SessionError> {
        if self.phase != SessionPhase::Idle {
            return Err(SessionError::NotRestartable);
        }

        self.phase = SessionPhase::Running;
        log::info!(
            "session started: mode {:?}, {} messages in catalog '{}'",
            self.config.mode,
            self.catalog.stats().num_messages,
            self.catalog.source()
        );

        let timeout = self.config.poll_timeout();
        let stop_reason = loop {
            if cancel.is_cancelled() {
                log::info!("cancellation requested, stopping session");
                break StopReason::Cancelled;
            }

            match source.next_frame(timeout) {
                Ok(Some(frame)) => self.handle_frame(frame, observer),
                // Timeout while the bus is silent: re-check cancellation
                Ok(None) => continue,
                Err(SourceError::Exhausted) => {
                    log::info!("frame source exhausted, stopping session");
                    break StopReason::SourceExhausted;
                }
                Err(e) => {
                    log::warn!("frame source error, stopping session: {}", e);
                    break StopReason::SourceError(e.to_string());
                }
            }
        };

        self.phase = SessionPhase::Stopping;
        let flush = self.flush();
        if let Err(ref e) = flush {
            log::error!("flush failed: {} (buffered data retained)", e);
        }
        self.phase = SessionPhase::Stopped;

        log::info!(
            "session stopped: {} frames, {} decoded, {} unique messages, \
             {} lookup misses, {} decode errors",
            self.frames_received,
            self.frames_decoded,
            self.tracker.unique_messages(),
            self.lookup_misses,
            self.decode_errors
        );

        Ok(SessionSummary {
            frames_received: self.frames_received,
            frames_decoded: self.frames_decoded,
            rows_logged: self.row_sink.len() as u64,
            decode_errors: self.decode_errors,
            lookup_misses: self.lookup_misses,
            unique_messages: self.tracker.unique_messages(),
            stop_reason,
            flush,
        })
    }

    /// Decode one frame and feed the tracker, filter and sink
    fn handle_frame(&mut self, frame: RawFrame, observer: &mut dyn SightingObserver) {
        self.frames_received += 1;

        let Some(layout) = self.catalog.lookup(frame.can_id) else {
            log::trace!("unknown arbitration id {:#x}, dropping frame", frame.can_id);
            self.lookup_misses += 1;
            return;
        };

        let values = match FrameDecoder::decode(layout, &frame.data) {
            Ok(values) => values,
            Err(e) => {
                log::debug!("failed to decode {:#x} ('{}'): {}", frame.can_id, layout.name, e);
                self.decode_errors += 1;
                return;
            }
        };
        self.frames_decoded += 1;

        if self.tracker.observe(&layout.name) {
            self.tracker
                .capture_signals(&layout.name, active_signal_names(layout, &values));
            observer.on_first_sighting(&FirstSighting {
                message_name: layout.name.clone(),
                arbitration_id: layout.id,
                byte_length: layout.byte_length,
            });
        }

        if self.config.mode == SessionMode::Logging {
            let filtered = self.filter.apply(values);
            self.row_sink.append(DecodedRow {
                timestamp_ns: frame.timestamp_ns,
                can_id: frame.can_id,
                values: filtered,
            });
        }
    }

    /// Flush the sink for the configured mode, once
    fn flush(&self) -> Result<FlushOutcome, SinkError> {
        match self.config.mode {
            SessionMode::Discovery => self
                .discovery_sink
                .flush(self.tracker.inventory(), &self.config.output_dir),
            SessionMode::Logging => self.row_sink.flush(&self.config.output_dir),
        }
    }
}

/// Signal names active in a decoded frame, in layout order
fn active_signal_names(
    layout: &MessageLayout,
    values: &HashMap<String, PhysicalValue>,
) -> Vec<String> {
    layout
        .signals
        .iter()
        .filter(|s| values.contains_key(&s.name))
        .map(|s| s.name.clone())
        .collect()
}
