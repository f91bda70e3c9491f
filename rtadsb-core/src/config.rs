//! Pipeline configuration.
//!
//! All knobs the process feeds into the core: chunk sizing, the ground
//! station reference position, track TTL, repair, and detector tuning.
//! Window sizing assumes the fixed 2 MHz sample rate.

use serde::Serialize;

use crate::demod::WINDOW_SIZE;
use crate::types::{Error, Result};

/// Default chunk size in samples (~1 s of signal at 2 MHz, so eviction
/// and dashboard cadence land near 1 Hz).
pub const DEFAULT_CHUNK_SAMPLES: usize = 2_048_000;

/// The one sample rate the demodulator window math is built for.
pub const DEFAULT_SAMPLE_RATE: u32 = 2_000_000;

/// Default ground station reference: Honolulu.
pub const DEFAULT_REFERENCE: (f64, f64) = (21.315603, -157.858093);

/// Seconds of silence before a track is evicted.
pub const DEFAULT_TRACK_TTL: f64 = 60.0;

/// Detector threshold multiplier k in `T = mean + k * stddev`.
pub const DEFAULT_THRESHOLD_SIGMA: f32 = 4.0;

/// Capacity of the recent-packet ring kept for reporting.
pub const DEFAULT_RECENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    /// Samples per acquisition chunk.
    pub chunk_samples: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Reference position (lat, lon) seeded into every new track.
    pub reference: (f64, f64),
    /// Track time-to-live in seconds.
    pub track_ttl: f64,
    /// Attempt single-bit repair on CRC failures. Expensive; off the hot
    /// path by default.
    pub repair: bool,
    /// Detector threshold multiplier k.
    pub threshold_sigma: f32,
    /// Discard queued chunks beyond the one being processed. The pipeline
    /// prefers fresh data over complete data; turn this off to process
    /// every chunk at the cost of growing latency.
    pub drop_backlog: bool,
    /// Recent-packet ring capacity.
    pub recent_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            chunk_samples: DEFAULT_CHUNK_SAMPLES,
            sample_rate: DEFAULT_SAMPLE_RATE,
            reference: DEFAULT_REFERENCE,
            track_ttl: DEFAULT_TRACK_TTL,
            repair: false,
            threshold_sigma: DEFAULT_THRESHOLD_SIGMA,
            drop_backlog: true,
            recent_capacity: DEFAULT_RECENT_CAPACITY,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_samples < WINDOW_SIZE {
            return Err(Error::Config(format!(
                "chunk_samples must be at least {WINDOW_SIZE}, got {}",
                self.chunk_samples
            )));
        }
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be nonzero".into()));
        }
        if !(self.threshold_sigma > 0.0) {
            return Err(Error::Config(format!(
                "threshold_sigma must be positive, got {}",
                self.threshold_sigma
            )));
        }
        if !(self.track_ttl > 0.0) {
            return Err(Error::Config(format!(
                "track_ttl must be positive, got {}",
                self.track_ttl
            )));
        }
        let (lat, lon) = self.reference;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::Config(format!(
                "reference position out of range: ({lat}, {lon})"
            )));
        }
        if self.recent_capacity == 0 {
            return Err(Error::Config("recent_capacity must be nonzero".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_tiny_chunk() {
        let cfg = PipelineConfig {
            chunk_samples: 100,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_nonpositive_sigma() {
        let cfg = PipelineConfig {
            threshold_sigma: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_reference() {
        let cfg = PipelineConfig {
            reference: (120.0, 0.0),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let cfg = PipelineConfig {
            track_ttl: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
