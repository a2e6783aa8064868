//! Cooperative cancellation
//!
//! A shared atomic flag polled once per loop iteration and after each
//! wait timeout. The core never installs OS signal handlers; the
//! embedding application (e.g. the CLI wiring Ctrl+C) triggers the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag
///
/// Clones share state: triggering any clone cancels the session.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create a new, untriggered flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_starts_untriggered() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
    }

    #[test]
    fn test_trigger_sets_flag() {
        let flag = CancelFlag::new();
        flag.trigger();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        flag.trigger();
        assert!(clone.is_cancelled());
    }
}
