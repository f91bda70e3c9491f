//! Message integrity checking and single-bit repair.
//!
//! Acceptance order: full 112-bit CRC first, then the 56-bit prefix
//! (a short squitter arrives embedded in the long demodulation window,
//! trailed by noise). Repair is a linear sweep over single-bit-flip
//! hypotheses — one CRC evaluation per bit position, so it stays behind a
//! flag and off the default hot path.
//!
//! The all-zero reading is the CRC's trivial codeword and is what flat
//! silence demodulates to; it is screened out as a non-message.

use serde::Serialize;

use rtadsb_fields::crc;
use rtadsb_fields::{hex_decode, hex_encode};

use crate::demod::LONG_MSG_BITS;

const LONG_HEX_DIGITS: usize = 28;
const SHORT_MSG_BYTES: usize = 7;

/// Squitter form of a validated message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageForm {
    Short,
    Long,
}

/// A CRC-clean hex message. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedMessage {
    /// Uppercase hex, truncated to 14 digits for the short form.
    pub hex: String,
    pub form: MessageForm,
    /// True when a bit flip was needed to reach a zero remainder.
    pub repaired: bool,
}

/// Validate a 28-digit demodulated hex string.
///
/// Returns the accepted message, or `None` when no zero-remainder reading
/// exists — the common case for noise-triggered candidates, silently
/// dropped upstream.
pub fn validate(msg_hex: &str, repair: bool) -> Option<ValidatedMessage> {
    if msg_hex.len() != LONG_HEX_DIGITS {
        return None;
    }
    let mut data = hex_decode(msg_hex)?;

    if let Some(msg) = accept(&data, false) {
        return Some(msg);
    }

    if repair {
        return repair_sweep(&mut data);
    }
    None
}

/// Accept a byte reading if either form leaves a zero remainder, long
/// form first. The zero codeword is rejected in both forms.
fn accept(data: &[u8], repaired: bool) -> Option<ValidatedMessage> {
    if crc::crc24(data) == 0 && data.iter().any(|&b| b != 0) {
        return Some(ValidatedMessage {
            hex: hex_encode(data),
            form: MessageForm::Long,
            repaired,
        });
    }

    let prefix = &data[..SHORT_MSG_BYTES];
    if crc::crc24(prefix) == 0 && prefix.iter().any(|&b| b != 0) {
        return Some(ValidatedMessage {
            hex: hex_encode(prefix),
            form: MessageForm::Short,
            repaired,
        });
    }
    None
}

/// Try every single-bit flip of the message, checking both forms per
/// flip. First zero remainder wins; all positions are exhausted before
/// giving up. CRC-24 syndromes of single-bit errors are distinct, so at
/// most one flip can validate per form.
fn repair_sweep(data: &mut [u8]) -> Option<ValidatedMessage> {
    for bit in 0..LONG_MSG_BITS {
        let mask = 1u8 << (7 - bit % 8);
        data[bit / 8] ^= mask;

        if let Some(msg) = accept(data, true) {
            return Some(msg);
        }

        data[bit / 8] ^= mask;
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const KLM: &str = "8D4840D6202CC371C32CE0576098";
    const SURFACE: &str = "8CA4E94A3A9A00D990FBD6B4930D";
    // Valid DF11 followed by 56 bits of junk, as demodulated off the air
    const SHORT_EMBEDDED: &str = "5DA4E94A3A9C3ADEADBEEF00C0DE";

    fn flip_bit(hex: &str, bit: usize) -> String {
        let mut data = hex_decode(hex).unwrap();
        data[bit / 8] ^= 1 << (7 - bit % 8);
        hex_encode(&data)
    }

    #[test]
    fn test_accepts_valid_long() {
        let msg = validate(KLM, false).unwrap();
        assert_eq!(msg.hex, KLM);
        assert_eq!(msg.form, MessageForm::Long);
        assert!(!msg.repaired);
    }

    #[test]
    fn test_accepts_short_prefix() {
        let msg = validate(SHORT_EMBEDDED, false).unwrap();
        assert_eq!(msg.hex, "5DA4E94A3A9C3A");
        assert_eq!(msg.form, MessageForm::Short);
        assert!(!msg.repaired);
    }

    #[test]
    fn test_rejects_corrupt_without_repair() {
        assert!(validate(&flip_bit(KLM, 40), false).is_none());
    }

    #[test]
    fn test_repairs_single_bit_error() {
        let msg = validate(&flip_bit(KLM, 40), true).unwrap();
        assert_eq!(msg.hex, KLM);
        assert_eq!(msg.form, MessageForm::Long);
        assert!(msg.repaired);
    }

    #[test]
    fn test_repair_exhaustive_over_all_positions() {
        // Every single-bit corruption of a valid message must sweep back
        // to the original
        for original in [KLM, SURFACE] {
            for bit in 0..112 {
                let msg = validate(&flip_bit(original, bit), true)
                    .unwrap_or_else(|| panic!("bit {bit} not repaired"));
                assert_eq!(msg.hex, original, "bit {bit}");
                assert!(msg.repaired);
            }
        }
    }

    #[test]
    fn test_repair_gives_up_on_double_error() {
        let corrupt = flip_bit(&flip_bit(KLM, 40), 77);
        assert!(validate(&corrupt, true).is_none());
    }

    #[test]
    fn test_rejects_all_zero_reading() {
        // Flat silence demodulates to the zero codeword
        let silence = "0".repeat(28);
        assert!(validate(&silence, false).is_none());
        assert!(validate(&silence, true).is_none());
    }

    #[test]
    fn test_rejects_wrong_length_and_garbage() {
        assert!(validate("", false).is_none());
        assert!(validate("5DA4E94A3A9C3A", false).is_none());
        assert!(validate("ZZZZZZZZZZZZZZZZZZZZZZZZZZZZ", true).is_none());
    }

    #[test]
    fn test_valid_message_not_marked_repaired() {
        assert!(!validate(SURFACE, true).unwrap().repaired);
    }
}
