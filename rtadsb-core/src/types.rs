//! Shared types: error enum, sample chunks, and the decoded `Packet`.

use serde::Serialize;
use thiserror::Error;

use rtadsb_fields::{fields, icao_to_string, Icao};

use crate::validate::{MessageForm, ValidatedMessage};

/// All errors produced by rtadsb-core.
///
/// Decode misses are deliberately NOT here — a chunk that yields no
/// messages is the normal case at 1090 MHz, expressed as empty output.
#[derive(Debug, Error)]
pub enum Error {
    #[error("sample source I/O: {0}")]
    Source(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Sample chunk
// ---------------------------------------------------------------------------

/// One acquisition's worth of magnitude samples.
///
/// Produced once by the acquisition stage, stamped with monotonic seconds
/// since pipeline start, and handed to the decoding stage by value — the
/// chunk is consumed exactly once and never mutated.
#[derive(Debug, Clone)]
pub struct SampleChunk {
    pub samples: Vec<f32>,
    pub timestamp: f64,
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// A validated message plus its capture metadata. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Packet {
    /// Uppercase hex, 14 or 28 digits.
    pub message: String,
    /// Monotonic capture time, seconds since pipeline start.
    pub timestamp: f64,
    /// Signal-to-noise in dB; `None` when the noise floor was zero.
    pub snr: Option<f64>,
    /// Transmitter address, when one can be derived for this format.
    pub transmitter_id: Option<Icao>,
    pub downlink_format: u8,
    /// ADS-B typecode; `None` for short squitters and non-ADS-B formats.
    pub typecode: Option<u8>,
    pub is_short: bool,
    /// True when single-bit repair was applied to pass the CRC.
    pub repaired: bool,
}

impl Packet {
    /// Build a packet from a validated message. `None` only when the hex
    /// has no recognizable downlink format byte, which a validated
    /// message never hits in practice.
    pub fn from_message(msg: ValidatedMessage, timestamp: f64, snr: Option<f64>) -> Option<Packet> {
        let downlink_format = fields::df(&msg.hex)?;
        Some(Packet {
            transmitter_id: fields::icao(&msg.hex),
            typecode: fields::typecode(&msg.hex),
            is_short: msg.form == MessageForm::Short,
            repaired: msg.repaired,
            message: msg.hex,
            timestamp,
            snr,
            downlink_format,
        })
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.6}] DF{}", self.timestamp, self.downlink_format)?;
        if let Some(tc) = self.typecode {
            write!(f, " TC{tc}")?;
        }
        match &self.transmitter_id {
            Some(id) => write!(f, " {}", icao_to_string(id))?,
            None => write!(f, " ------")?,
        }
        if let Some(snr) = self.snr {
            write!(f, " {snr:.1}dB")?;
        }
        write!(f, " {}", self.message)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn validated(hex: &str) -> ValidatedMessage {
        ValidatedMessage {
            hex: hex.to_string(),
            form: if hex.len() == 14 {
                MessageForm::Short
            } else {
                MessageForm::Long
            },
            repaired: false,
        }
    }

    #[test]
    fn test_packet_from_long_message() {
        let pkt =
            Packet::from_message(validated("8D4840D6202CC371C32CE0576098"), 1.5, Some(12.0))
                .unwrap();
        assert_eq!(pkt.downlink_format, 17);
        assert_eq!(pkt.typecode, Some(4));
        assert_eq!(pkt.transmitter_id, Some([0x48, 0x40, 0xD6]));
        assert!(!pkt.is_short);
        assert_eq!(pkt.timestamp, 1.5);
    }

    #[test]
    fn test_packet_from_short_message() {
        let pkt = Packet::from_message(validated("5DA4E94A3A9C3A"), 0.0, None).unwrap();
        assert_eq!(pkt.downlink_format, 11);
        assert_eq!(pkt.typecode, None);
        assert_eq!(pkt.transmitter_id, Some([0xA4, 0xE9, 0x4A]));
        assert!(pkt.is_short);
    }

    #[test]
    fn test_packet_display() {
        let pkt =
            Packet::from_message(validated("8D4840D6202CC371C32CE0576098"), 2.0, Some(9.5))
                .unwrap();
        let line = pkt.to_string();
        assert!(line.contains("DF17"));
        assert!(line.contains("TC4"));
        assert!(line.contains("4840D6"));
        assert!(line.contains("9.5dB"));
    }
}
