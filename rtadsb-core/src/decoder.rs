//! Per-chunk decode: candidate scan → demodulate → validate → SNR.
//!
//! `ChunkDecoder` is the pure part of the decoding stage — no threads, no
//! registry. One chunk in, zero or more packets out; everything that
//! doesn't survive the CRC simply isn't in the output.

use crate::config::PipelineConfig;
use crate::demod::{self, WINDOW_SIZE};
use crate::types::{Packet, SampleChunk};
use crate::validate::{self, MessageForm, ValidatedMessage};

/// Samples a validated message occupied on air: preamble plus two samples
/// per bit.
fn message_samples(msg: &ValidatedMessage) -> usize {
    match msg.form {
        MessageForm::Short => 16 + 56 * 2,
        MessageForm::Long => 16 + 112 * 2,
    }
}

/// What one chunk produced.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub packets: Vec<Packet>,
    pub candidates: usize,
    pub noise_floor: f32,
}

pub struct ChunkDecoder {
    threshold_sigma: f32,
    repair: bool,
    sample_rate: u32,
}

impl ChunkDecoder {
    pub fn new(config: &PipelineConfig) -> Self {
        ChunkDecoder {
            threshold_sigma: config.threshold_sigma,
            repair: config.repair,
            sample_rate: config.sample_rate,
        }
    }

    /// Run the full decode path over one chunk.
    ///
    /// Packet timestamps are refined by the candidate's sample offset
    /// within the chunk. Candidates too close to the chunk end demodulate
    /// as misses and drop out here. Candidates inside the span of an
    /// already-accepted message are echoes of its own pulses and are
    /// skipped — the scan resynchronizes past each decode.
    pub fn decode(&self, chunk: &SampleChunk) -> ChunkOutcome {
        let scan = demod::scan(&chunk.samples, self.threshold_sigma);

        let mut packets = Vec::new();
        let mut resync = 0usize;
        for &offset in &scan.candidates {
            if offset < resync {
                continue;
            }
            let end = (offset + WINDOW_SIZE).min(chunk.samples.len());
            let window = &chunk.samples[offset..end];

            let Some(hex) = demod::demodulate(window) else {
                continue;
            };
            let Some(msg) = validate::validate(&hex, self.repair) else {
                continue;
            };

            resync = offset + message_samples(&msg);
            let snr = demod::snr_db(window, scan.noise_floor);
            let timestamp = chunk.timestamp + offset as f64 / self.sample_rate as f64;
            if let Some(packet) = Packet::from_message(msg, timestamp, snr) {
                packets.push(packet);
            }
        }

        ChunkOutcome {
            packets,
            candidates: scan.candidates.len(),
            noise_floor: scan.noise_floor,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
