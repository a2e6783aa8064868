//! Immutable signal catalog
//!
//! In-memory representation of message and signal layouts, indexed by
//! arbitration id. A catalog is validated and frozen at construction:
//! lookup is a plain HashMap read, safe to share by reference across any
//! number of concurrent decode calls.

use crate::types::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Byte order for signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Little-endian (Intel format)
    LittleEndian,
    /// Big-endian (Motorola format)
    BigEndian,
}

/// Value representation of the extracted raw bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Unsigned integer
    Unsigned,
    /// Two's-complement signed integer
    Signed,
    /// IEEE-754 float (bit width must be 32 or 64)
    Float,
}

/// Multiplex gate: the signal is only present when `selector` decodes to
/// `value` in the same frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplexSelector {
    /// Name of the selector signal within the same message
    pub selector: String,
    /// Raw selector value for which this signal is active
    pub value: u64,
}

/// A CAN signal layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalLayout {
    /// Signal name, unique within its message
    pub name: String,
    /// Start bit position in the frame
    pub start_bit: u16,
    /// Width in bits (1-64)
    pub bit_width: u16,
    /// Byte order for extraction
    pub byte_order: ByteOrder,
    /// Raw value representation
    pub value_kind: ValueKind,
    /// Linear scale: physical = raw * scale + offset
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Linear offset
    #[serde(default)]
    pub offset: f64,
    /// Documented minimum physical value (not enforced by decode)
    #[serde(default)]
    pub min: Option<f64>,
    /// Documented maximum physical value (not enforced by decode)
    #[serde(default)]
    pub max: Option<f64>,
    /// Engineering unit (e.g. "km/h", "rpm")
    #[serde(default)]
    pub unit: Option<String>,
    /// Multiplex gate (None for plain signals)
    #[serde(default)]
    pub multiplex: Option<MultiplexSelector>,
}

fn default_scale() -> f64 {
    1.0
}

impl SignalLayout {
    /// Check a physical value against the declared min/max bounds
    ///
    /// Decode never clamps; callers wanting validation check explicitly.
    /// Missing bounds pass.
    pub fn is_within_bounds(&self, physical: f64) -> bool {
        if let Some(min) = self.min {
            if physical < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if physical > max {
                return false;
            }
        }
        true
    }
}

/// A CAN message layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLayout {
    /// CAN arbitration id
    pub id: u32,
    /// True for extended (29-bit) ids
    #[serde(default)]
    pub is_extended: bool,
    /// Message name, unique within the catalog
    pub name: String,
    /// Declared payload length in bytes (DLC)
    pub byte_length: usize,
    /// Signal layouts, in declaration order
    pub signals: Vec<SignalLayout>,
}

impl MessageLayout {
    /// All raw selector values declared by multiplexed signals gated on
    /// `selector`
    pub fn declared_multiplex_values(&self, selector: &str) -> HashSet<u64> {
        self.signals
            .iter()
            .filter_map(|s| s.multiplex.as_ref())
            .filter(|m| m.selector == selector)
            .map(|m| m.value)
            .collect()
    }
}

/// Catalog statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStats {
    /// Number of message layouts
    pub num_messages: usize,
    /// Total number of signal layouts
    pub num_signals: usize,
}

/// Immutable catalog mapping arbitration id -> message layout
///
/// Built once at session start and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Identifier of the catalog's origin (e.g. DBC file stem), used to
    /// derive discovery output filenames
    source: String,
    messages: HashMap<u32, MessageLayout>,
}

impl Catalog {
    /// Build a catalog from pre-parsed message layouts
    ///
    /// Fails with `CatalogError::Malformed` on duplicate arbitration ids
    /// or message names, duplicate signal names within a message, names
    /// containing CSV separator characters, bit ranges that do not fit
    /// the declared byte length, invalid bit widths, float signals that
    /// are not 32 or 64 bits wide, or multiplex selectors that do not
    /// name a plain signal in the same message.
    pub fn new(source: impl Into<String>, layouts: Vec<MessageLayout>) -> Result<Self, CatalogError> {
        let mut messages: HashMap<u32, MessageLayout> = HashMap::with_capacity(layouts.len());
        let mut names: HashSet<String> = HashSet::with_capacity(layouts.len());

        for message in layouts {
            validate_message(&message)?;
            if let Some(existing) = messages.get(&message.id) {
                return Err(CatalogError::Malformed(format!(
                    "duplicate arbitration id 0x{:X} ('{}' and '{}')",
                    message.id, existing.name, message.name
                )));
            }
            if !names.insert(message.name.clone()) {
                return Err(CatalogError::Malformed(format!(
                    "duplicate message name '{}'",
                    message.name
                )));
            }
            messages.insert(message.id, message);
        }

        Ok(Self {
            source: source.into(),
            messages,
        })
    }

    /// Look up the message layout for an arbitration id
    pub fn lookup(&self, can_id: u32) -> Option<&MessageLayout> {
        self.messages.get(&can_id)
    }

    /// Catalog source identifier
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Message and signal counts
    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            num_messages: self.messages.len(),
            num_signals: self.messages.values().map(|m| m.signals.len()).sum(),
        }
    }
}

// Names end up as CSV cells and semicolon-joined lists in the sinks
fn validate_name(kind: &str, name: &str) -> Result<(), CatalogError> {
    if name.contains([',', ';', '"', '\n', '\r']) {
        return Err(CatalogError::Malformed(format!(
            "{} name '{}' contains a CSV separator character",
            kind,
            name.escape_default()
        )));
    }
    Ok(())
}

fn validate_message(message: &MessageLayout) -> Result<(), CatalogError> {
    validate_name("message", &message.name)?;

    let mut names = HashSet::with_capacity(message.signals.len());
    let frame_bits = message.byte_length * 8;

    for signal in &message.signals {
        validate_name("signal", &signal.name)?;
        if !names.insert(signal.name.as_str()) {
            return Err(CatalogError::Malformed(format!(
                "message '{}': duplicate signal name '{}'",
                message.name, signal.name
            )));
        }

        if signal.bit_width == 0 || signal.bit_width > 64 {
            return Err(CatalogError::Malformed(format!(
                "message '{}': signal '{}' has invalid bit width {}",
                message.name, signal.name, signal.bit_width
            )));
        }

        if signal.start_bit as usize + signal.bit_width as usize > frame_bits {
            return Err(CatalogError::Malformed(format!(
                "message '{}': signal '{}' spans bits {}..{} but the message is {} bytes",
                message.name,
                signal.name,
                signal.start_bit,
                signal.start_bit as usize + signal.bit_width as usize,
                message.byte_length
            )));
        }

        if signal.value_kind == ValueKind::Float && signal.bit_width != 32 && signal.bit_width != 64 {
            return Err(CatalogError::Malformed(format!(
                "message '{}': float signal '{}' must be 32 or 64 bits wide, got {}",
                message.name, signal.name, signal.bit_width
            )));
        }

        if let Some(ref mux) = signal.multiplex {
            let selector_ok = message
                .signals
                .iter()
                .any(|s| s.name == mux.selector && s.multiplex.is_none());
            if !selector_ok {
                return Err(CatalogError::Malformed(format!(
                    "message '{}': signal '{}' is gated on unknown selector '{}'",
                    message.name, signal.name, mux.selector
                )));
            }
        }
    }

    Ok(())
}
