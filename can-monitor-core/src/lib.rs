//! CAN Monitor Core Library
//!
//! Decodes live CAN traffic against a pre-parsed signal catalog and
//! records a monitoring session: which message types appeared, and
//! (optionally filtered) decoded signal values, persisted at session stop
//! under graceful-cancellation semantics.
//!
//! # Architecture
//!
//! The library is a pure decode-and-record pipeline:
//! - An immutable `Catalog` maps arbitration ids to message layouts
//! - `FrameDecoder` turns raw payloads into physical signal values
//! - `SessionTracker` reports each message name's first sighting once
//! - `SignalFilter` optionally restricts output to an allow-list
//! - `RowSink` / `DiscoverySink` buffer output and flush it atomically
//! - `SessionLoop` drives the above until cancelled
//!
//! The library does NOT:
//! - Talk to bus hardware (implement `FrameSource` for that)
//! - Parse textual catalog formats (DBC parsing is upstream)
//! - Render any UI; first sightings go to a `SightingObserver` callback
//!
//! # Example Usage
//!
//! ```no_run
//! use can_monitor_core::{
//!     CancelFlag, Catalog, NullObserver, ReplaySource, SessionConfig, SessionLoop, SessionMode,
//! };
//!
//! let catalog = Catalog::new("ccan", vec![/* pre-parsed layouts */]).unwrap();
//! let config = SessionConfig::new(SessionMode::Discovery, "./out");
//! let mut session = SessionLoop::new(catalog, config);
//!
//! let cancel = CancelFlag::new();
//! let mut source = ReplaySource::new(vec![/* frames */]);
//! let summary = session.run(&mut source, &cancel, &mut NullObserver).unwrap();
//! println!("saw {} unique messages", summary.unique_messages);
//! ```

// Public modules
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod filter;
pub mod frame_decoder;
pub mod session;
pub mod session_loop;
pub mod sink;
pub mod source;
pub mod types;

// Re-export main types for convenience
pub use cancel::CancelFlag;
pub use catalog::{ByteOrder, Catalog, CatalogStats, MessageLayout, MultiplexSelector, SignalLayout, ValueKind};
pub use config::{SessionConfig, SessionMode};
pub use filter::SignalFilter;
pub use frame_decoder::FrameDecoder;
pub use session::{FirstSighting, MessageInventory, NullObserver, SessionTracker, SightingObserver};
pub use session_loop::{SessionLoop, SessionPhase, SessionSummary, StopReason};
pub use sink::{DiscoverySink, FlushOutcome, RowSink};
pub use source::{FrameSource, ReplaySource};
pub use types::{
    CatalogError, DecodeError, DecodedRow, PhysicalValue, RawFrame, SessionError, SinkError,
    SourceError, Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
