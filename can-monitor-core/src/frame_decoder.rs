//! Frame decoding engine
//!
//! Extracts physical signal values from raw CAN payloads based on a
//! message layout. Handles bit extraction, endianness, sign extension,
//! IEEE-754 float signals, multiplexing and linear scaling. Decoding is a
//! pure function: it never mutates the catalog or the payload and is safe
//! to call concurrently on the same layout.

use crate::catalog::{ByteOrder, MessageLayout, SignalLayout, ValueKind};
use crate::types::{DecodeError, PhysicalValue};
use std::collections::HashMap;

/// Frame decoder - extracts signals from CAN payloads
pub struct FrameDecoder;

impl FrameDecoder {
    /// Decode a payload into a signal name -> physical value mapping
    ///
    /// Multiplexed signals whose selector does not match are skipped. A
    /// selector value that matches no declared variant drops all signals
    /// gated on it (non-fatal); plain signals still decode. A payload too
    /// short for any active signal fails the whole frame with
    /// `DecodeError::PayloadTooShort`.
    pub fn decode(
        layout: &MessageLayout,
        payload: &[u8],
    ) -> Result<HashMap<String, PhysicalValue>, DecodeError> {
        // Resolve each multiplexer selector once, up front
        let mut selector_values: HashMap<&str, Option<u64>> = HashMap::new();
        for signal in &layout.signals {
            let Some(ref mux) = signal.multiplex else {
                continue;
            };
            if selector_values.contains_key(mux.selector.as_str()) {
                continue;
            }
            let Some(selector) = layout.signals.iter().find(|s| s.name == mux.selector) else {
                // Catalog validation guarantees the selector exists
                continue;
            };
            match Self::resolve_multiplex_value(layout, selector, payload) {
                Ok(value) => {
                    selector_values.insert(mux.selector.as_str(), Some(value));
                }
                Err(DecodeError::UnknownMultiplexSelector { selector, value }) => {
                    log::debug!(
                        "message '{}': selector '{}' value {} matches no declared variant, \
                         omitting multiplexed signals",
                        layout.name,
                        selector,
                        value
                    );
                    selector_values.insert(mux.selector.as_str(), None);
                }
                Err(e) => return Err(e),
            }
        }

        let mut values = HashMap::with_capacity(layout.signals.len());
        for signal in &layout.signals {
            if let Some(ref mux) = signal.multiplex {
                match selector_values.get(mux.selector.as_str()) {
                    Some(Some(active)) if *active == mux.value => {}
                    _ => continue,
                }
            }

            let raw = Self::extract_raw(signal, payload)?;
            values.insert(signal.name.clone(), Self::to_physical(signal, raw));
        }

        Ok(values)
    }

    /// Resolve the raw value of a multiplexer selector signal
    ///
    /// Returns `DecodeError::UnknownMultiplexSelector` when the extracted
    /// value matches no variant declared by any signal gated on this
    /// selector.
    pub fn resolve_multiplex_value(
        layout: &MessageLayout,
        selector: &SignalLayout,
        payload: &[u8],
    ) -> Result<u64, DecodeError> {
        let raw = Self::extract_raw(selector, payload)?;
        let declared = layout.declared_multiplex_values(&selector.name);
        if declared.contains(&raw) {
            Ok(raw)
        } else {
            Err(DecodeError::UnknownMultiplexSelector {
                selector: selector.name.clone(),
                value: raw,
            })
        }
    }

    /// Extract the raw bits of a signal from the payload
    fn extract_raw(signal: &SignalLayout, payload: &[u8]) -> Result<u64, DecodeError> {
        let start_bit = signal.start_bit as usize;
        let length = signal.bit_width as usize;

        let needed = (start_bit + length + 7) / 8;
        if needed > payload.len() {
            return Err(DecodeError::PayloadTooShort {
                needed,
                actual: payload.len(),
            });
        }

        let raw = match signal.byte_order {
            ByteOrder::LittleEndian => Self::extract_little_endian(payload, start_bit, length),
            ByteOrder::BigEndian => Self::extract_big_endian(payload, start_bit, length),
        };

        Ok(raw)
    }

    /// Extract with little-endian (Intel) bit numbering
    ///
    /// Start bit points to the LSB of the signal; bits are numbered from
    /// the least-significant bit of byte 0 and extraction crosses byte
    /// boundaries towards higher addresses.
    fn extract_little_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
        let mut result: u64 = 0;

        for i in 0..length {
            let bit_pos = start_bit + i;
            let byte_idx = bit_pos / 8;
            let bit_in_byte = bit_pos % 8;

            let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
            result |= (bit_value as u64) << i;
        }

        result
    }

    /// Extract with big-endian (Motorola) bit numbering
    ///
    /// Start bit points to the MSB of the signal; bit 0 is the MSB of
    /// byte 0 and the signal grows towards higher bit numbers.
    fn extract_big_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
        let mut result: u64 = 0;

        for i in 0..length {
            let bit_pos = start_bit + i;
            let byte_idx = bit_pos / 8;
            let bit_in_byte = 7 - (bit_pos % 8);

            let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
            result |= (bit_value as u64) << (length - 1 - i);
        }

        result
    }

    /// Sign-extend a raw value from N bits to 64 bits
    fn sign_extend(value: u64, bit_length: usize) -> i64 {
        if bit_length >= 64 {
            return value as i64;
        }

        let sign_bit = 1u64 << (bit_length - 1);
        if (value & sign_bit) != 0 {
            let mask = !0u64 << bit_length;
            (value | mask) as i64
        } else {
            value as i64
        }
    }

    /// Reinterpret raw bits per the declared value kind and apply the
    /// linear conversion (physical = raw * scale + offset)
    ///
    /// Bounds are deliberately not applied here; values outside declared
    /// min/max are emitted unclamped.
    fn to_physical(signal: &SignalLayout, raw: u64) -> PhysicalValue {
        let unscaled = signal.scale == 1.0 && signal.offset == 0.0;

        match signal.value_kind {
            ValueKind::Unsigned => {
                if unscaled && raw <= i64::MAX as u64 {
                    PhysicalValue::Integer(raw as i64)
                } else {
                    PhysicalValue::Float(raw as f64 * signal.scale + signal.offset)
                }
            }
            ValueKind::Signed => {
                let signed = Self::sign_extend(raw, signal.bit_width as usize);
                if unscaled {
                    PhysicalValue::Integer(signed)
                } else {
                    PhysicalValue::Float(signed as f64 * signal.scale + signal.offset)
                }
            }
            ValueKind::Float => {
                let value = if signal.bit_width == 32 {
                    f32::from_bits(raw as u32) as f64
                } else {
                    f64::from_bits(raw)
                };
                PhysicalValue::Float(value * signal.scale + signal.offset)
            }
        }
    }
}
