//! Core types for the CAN monitor library
//!
//! Defines the frame and value types flowing through a monitoring session,
//! plus the error taxonomy. Catalog construction errors are fatal before a
//! session starts; decode errors are per-frame and non-fatal; sink errors
//! surface at flush time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Timestamp type used throughout the monitor
pub type Timestamp = DateTime<Utc>;

/// A raw CAN frame as delivered by a frame source
///
/// This is the pre-decode representation: just the arbitration id, the
/// payload bytes and the arrival time. A frame is owned by the loop
/// iteration that received it and discarded after decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    /// CAN arbitration id (11-bit or 29-bit)
    pub can_id: u32,
    /// True if this is an extended (29-bit) CAN id
    #[serde(default)]
    pub is_extended: bool,
    /// Payload bytes (0-8 for classic CAN, up to 64 for CAN-FD)
    pub data: Vec<u8>,
    /// Arrival time in nanoseconds since the Unix epoch
    pub timestamp_ns: u64,
}

impl RawFrame {
    /// Convert the arrival time to a DateTime<Utc>
    pub fn timestamp(&self) -> Timestamp {
        let secs = (self.timestamp_ns / 1_000_000_000) as i64;
        let nsecs = (self.timestamp_ns % 1_000_000_000) as u32;
        DateTime::from_timestamp(secs, nsecs).unwrap_or_else(Utc::now)
    }

    /// Number of payload bytes (DLC)
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

/// A decoded physical signal value
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalValue {
    /// Unscaled integer signal (scale 1, offset 0)
    Integer(i64),
    /// Scaled or floating-point signal
    Float(f64),
}

impl PhysicalValue {
    /// Convert to f64 for bounds checks and comparisons
    pub fn as_f64(&self) -> f64 {
        match self {
            PhysicalValue::Integer(v) => *v as f64,
            PhysicalValue::Float(v) => *v,
        }
    }
}

impl fmt::Display for PhysicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalValue::Integer(v) => write!(f, "{}", v),
            PhysicalValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// One decoded frame, ready for the row sink
///
/// Key order in `values` is irrelevant; keys are unique per row.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRow {
    /// Arrival time in nanoseconds since the Unix epoch
    pub timestamp_ns: u64,
    /// CAN arbitration id
    pub can_id: u32,
    /// Signal name -> physical value
    pub values: HashMap<String, PhysicalValue>,
}

/// Errors raised while constructing a catalog
///
/// These are fatal: a session never starts on a malformed catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("malformed catalog: {0}")]
    Malformed(String),
}

/// Per-frame decode errors
///
/// Non-fatal at the session level: the frame is dropped, an error counter
/// increments and the loop continues.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecodeError {
    #[error("payload too short: signal needs {needed} bytes, frame has {actual}")]
    PayloadTooShort { needed: usize, actual: usize },

    #[error("multiplexer '{selector}' value {value} matches no declared variant")]
    UnknownMultiplexSelector { selector: String, value: u64 },
}

/// Errors raised while flushing a sink
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to finalize output file: {0}")]
    Persist(String),
}

/// Terminal errors from a frame source
///
/// Timeouts are not errors (`next_frame` returns `Ok(None)`); anything
/// here stops the session.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SourceError {
    #[error("frame source exhausted")]
    Exhausted,

    #[error("frame source device error: {0}")]
    Device(String),
}

/// Errors from driving a session loop
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session loop already ran; construct a new loop for a new session")]
    NotRestartable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_frame_timestamp_conversion() {
        let frame = RawFrame {
            can_id: 0x123,
            is_extended: false,
            data: vec![1, 2, 3],
            timestamp_ns: 1_500_000_000_123_456_789,
        };
        let ts = frame.timestamp();
        assert_eq!(ts.timestamp(), 1_500_000_000);
        assert_eq!(ts.timestamp_subsec_nanos(), 123_456_789);
        assert_eq!(frame.dlc(), 3);
    }

    #[test]
    fn test_physical_value_conversions() {
        assert_eq!(PhysicalValue::Integer(42).as_f64(), 42.0);
        assert_eq!(PhysicalValue::Float(-30.0).as_f64(), -30.0);
    }

    #[test]
    fn test_physical_value_display() {
        assert_eq!(format!("{}", PhysicalValue::Integer(42)), "42");
        assert_eq!(format!("{}", PhysicalValue::Float(-30.5)), "-30.5");
    }
}
