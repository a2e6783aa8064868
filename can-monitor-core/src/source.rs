//! Frame source contract
//!
//! The session loop pulls frames from a `FrameSource`, the sole blocking
//! point in a session. A timeout is not an error (`Ok(None)`); it exists
//! so the loop can re-check its cancellation flag while the bus is
//! silent. Terminal errors stop the session.
//!
//! Bus hardware acquisition is out of scope for this crate: a socketcan
//! or similar backend implements this trait in the embedding application.

use crate::types::{RawFrame, SourceError};
use std::collections::VecDeque;
use std::time::Duration;

/// An ordered producer of raw CAN frames
pub trait FrameSource {
    /// Wait up to `timeout` for the next frame
    ///
    /// Returns `Ok(None)` on timeout and `Err` on a terminal condition
    /// (device disconnect, source exhaustion).
    fn next_frame(&mut self, timeout: Duration) -> Result<Option<RawFrame>, SourceError>;
}

/// Replays a fixed sequence of frames, then reports exhaustion
///
/// Used by tests and by the CLI's file replay mode.
#[derive(Debug, Default)]
pub struct ReplaySource {
    frames: VecDeque<RawFrame>,
}

impl ReplaySource {
    /// Create a replay source over the given frames
    pub fn new(frames: Vec<RawFrame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    /// Number of frames left to replay
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self, _timeout: Duration) -> Result<Option<RawFrame>, SourceError> {
        match self.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None => Err(SourceError::Exhausted),
        }
    }
}
