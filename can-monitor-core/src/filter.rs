//! Optional signal allow-list
//!
//! Restricts decoded mappings to a named subset of signals. With no
//! allow-list the mapping passes through by ownership, untouched. Names
//! in the allow-list that never appear in any decoded frame are silently
//! ignored; a monitoring filter list is allowed to be broader than any
//! single message's signal set.

use crate::types::PhysicalValue;
use std::collections::{HashMap, HashSet};

/// Signal allow-list filter
#[derive(Debug, Clone, Default)]
pub struct SignalFilter {
    allow: Option<HashSet<String>>,
}

impl SignalFilter {
    /// Build a filter from an optional list of signal names
    pub fn new(allow: Option<Vec<String>>) -> Self {
        Self {
            allow: allow.map(|names| names.into_iter().collect()),
        }
    }

    /// Filter that passes everything through
    pub fn pass_through() -> Self {
        Self { allow: None }
    }

    /// True when no allow-list is configured
    pub fn is_pass_through(&self) -> bool {
        self.allow.is_none()
    }

    /// Apply the filter to a decoded mapping
    pub fn apply(
        &self,
        decoded: HashMap<String, PhysicalValue>,
    ) -> HashMap<String, PhysicalValue> {
        match &self.allow {
            None => decoded,
            Some(allow) => decoded
                .into_iter()
                .filter(|(name, _)| allow.contains(name))
                .collect(),
        }
    }
}
