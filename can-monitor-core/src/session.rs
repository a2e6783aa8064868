//! Session tracking and first-sighting notifications
//!
//! Per-session state: which message names have already been observed, and
//! the discovery inventory (message name -> signal names, captured from
//! the first observed frame and never updated afterwards, even if a later
//! frame activates a different multiplexed subset).

use std::collections::HashSet;

/// A first-sighting event for a message type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstSighting {
    /// Message name from the catalog
    pub message_name: String,
    /// CAN arbitration id
    pub arbitration_id: u32,
    /// Declared payload length in bytes
    pub byte_length: usize,
}

/// Observer for first-sighting events
///
/// Pass-through callback: the embedding application decides whether this
/// goes to a console, a UI or a log.
pub trait SightingObserver {
    /// Called exactly once per distinct message name per session
    fn on_first_sighting(&mut self, sighting: &FirstSighting);
}

/// Observer that ignores all sightings
#[derive(Debug, Default, Clone)]
pub struct NullObserver;

impl SightingObserver for NullObserver {
    fn on_first_sighting(&mut self, _sighting: &FirstSighting) {}
}

/// A message's signal inventory, captured at first sighting
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MessageInventory {
    /// Message name
    pub name: String,
    /// Signal names active in the first observed frame, in layout order
    pub signals: Vec<String>,
}

/// Tracks which message names have been observed in a session
///
/// The seen-set grows monotonically and never shrinks; the inventory is
/// kept in discovery order.
#[derive(Debug, Default)]
pub struct SessionTracker {
    seen: HashSet<String>,
    inventory: Vec<MessageInventory>,
}

impl SessionTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message name; returns true exactly once per distinct name
    pub fn observe(&mut self, name: &str) -> bool {
        if self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        true
    }

    /// Capture a message's signal list at the moment of discovery
    ///
    /// Later calls for the same name are ignored: the first-sighting
    /// signal set is authoritative for the session.
    pub fn capture_signals(&mut self, name: &str, signals: Vec<String>) {
        if self.inventory.iter().any(|m| m.name == name) {
            return;
        }
        self.inventory.push(MessageInventory {
            name: name.to_string(),
            signals,
        });
    }

    /// Discovery inventory, in discovery order
    pub fn inventory(&self) -> &[MessageInventory] {
        &self.inventory
    }

    /// Number of distinct message names observed
    pub fn unique_messages(&self) -> usize {
        self.seen.len()
    }
}
