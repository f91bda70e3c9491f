//! Magnitude-domain signal decoding: preamble detection, Manchester bit
//! recovery, and SNR estimation.
//!
//! At the 2 MHz sample rate:
//! - 1 bit = 2 samples (1 µs per bit)
//! - Preamble = 16 samples (8 µs), pulses at 0, 1, 3.5, 4.5 µs
//! - Long message (112 bits) = 224 samples after the preamble
//! - Total window for the longest message = 16 + 224 = 240 samples
//!
//! Detection is adaptive: the threshold floats at `mean + k * stddev` of
//! the whole chunk, so a hot front end or a quiet antenna both land in a
//! usable operating point without manual gain staging.

const SAMPLES_PER_BIT: usize = 2;
const PREAMBLE_SAMPLES: usize = 16;
pub const LONG_MSG_BITS: usize = 112;

/// Total window needed: preamble + longest message.
pub const WINDOW_SIZE: usize = PREAMBLE_SAMPLES + LONG_MSG_BITS * SAMPLES_PER_BIT; // 240

/// Preamble pulse positions in samples: pulses at 0, 1, 3.5, 4.5 µs.
const PULSE_POSITIONS: [usize; 4] = [0, 2, 7, 9];
/// Everything else in the 16-sample preamble window should be low.
const GAP_POSITIONS: [usize; 12] = [1, 3, 4, 5, 6, 8, 10, 11, 12, 13, 14, 15];

// ---------------------------------------------------------------------------
// Preamble detection
// ---------------------------------------------------------------------------

/// One chunk's worth of detection output: candidate message start offsets
/// (ascending) and the chunk noise floor reused by the SNR estimator.
#[derive(Debug, Clone)]
pub struct ChunkScan {
    pub candidates: Vec<usize>,
    pub noise_floor: f32,
}

/// Scan a magnitude chunk for preamble candidates.
///
/// Threshold `T = mean + threshold_sigma * stddev` over the whole chunk.
/// Every index whose sample reaches T and whose 16-sample window shows the
/// four-pulse preamble shape (pulse mean above gap mean) is a candidate.
/// The last 16 indices can't hold a full preamble and are never scanned.
pub fn scan(samples: &[f32], threshold_sigma: f32) -> ChunkScan {
    if samples.len() <= PREAMBLE_SAMPLES {
        let noise_floor = if samples.is_empty() {
            0.0
        } else {
            mean(samples) as f32
        };
        return ChunkScan {
            candidates: Vec::new(),
            noise_floor,
        };
    }

    let mean = mean(samples);
    let var = samples
        .iter()
        .map(|&s| {
            let d = s as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / samples.len() as f64;
    let threshold = (mean + threshold_sigma as f64 * var.sqrt()) as f32;

    let mut candidates = Vec::new();
    for i in 0..samples.len() - PREAMBLE_SAMPLES {
        if samples[i] < threshold {
            continue;
        }
        let window = &samples[i..i + PREAMBLE_SAMPLES];
        let pulse_mean: f32 =
            PULSE_POSITIONS.iter().map(|&p| window[p]).sum::<f32>() / PULSE_POSITIONS.len() as f32;
        let gap_mean: f32 =
            GAP_POSITIONS.iter().map(|&p| window[p]).sum::<f32>() / GAP_POSITIONS.len() as f32;
        if pulse_mean > gap_mean {
            candidates.push(i);
        }
    }

    ChunkScan {
        candidates,
        noise_floor: mean as f32,
    }
}

fn mean(samples: &[f32]) -> f64 {
    samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64
}

// ---------------------------------------------------------------------------
// Manchester demodulation
// ---------------------------------------------------------------------------

/// Demodulate a message window into a 28-digit hex string.
///
/// The window starts at a candidate offset and must span the preamble plus
/// the longest message form; a shorter slice (candidate too close to the
/// chunk end) is a decode miss, not an error. Each bit is a sample pair:
/// falling pair = 1, rising pair = 0.
pub fn demodulate(window: &[f32]) -> Option<String> {
    if window.len() < WINDOW_SIZE {
        return None;
    }

    let mut bits = [0u8; LONG_MSG_BITS];
    for (n, bit) in bits.iter_mut().enumerate() {
        let i = PREAMBLE_SAMPLES + n * SAMPLES_PER_BIT;
        *bit = (window[i] > window[i + 1]) as u8;
    }
    Some(bits_to_hex(&bits))
}

/// Pack bits (MSB first) into an uppercase hex string.
fn bits_to_hex(bits: &[u8]) -> String {
    let mut hex = String::with_capacity(bits.len() / 4);
    for chunk in bits.chunks_exact(4) {
        let value = (chunk[0] << 3) | (chunk[1] << 2) | (chunk[2] << 1) | chunk[3];
        hex.push(
            char::from_digit(value as u32, 16)
                .unwrap()
                .to_ascii_uppercase(),
        );
    }
    hex
}

// ---------------------------------------------------------------------------
// SNR estimation
// ---------------------------------------------------------------------------

/// Signal-to-noise of a message window in dB, against the chunk noise
/// floor: `10 * log10(mean(window) / noise_floor)`.
///
/// A zero or negative floor (dead input) has no meaningful SNR and yields
/// `None` rather than a division by zero.
pub fn snr_db(window: &[f32], noise_floor: f32) -> Option<f64> {
    if noise_floor <= 0.0 || window.is_empty() {
        return None;
    }
    let signal = mean(window);
    if signal <= 0.0 {
        return None;
    }
    Some(10.0 * (signal / noise_floor as f64).log10())
}

// ---------------------------------------------------------------------------
// Test signal synthesis
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::testsig::*;
    use super::*;

    const KLM: &str = "8D4840D6202CC371C32CE0576098";

    #[test]
    fn test_scan_finds_embedded_preamble() {
        let chunk = chunk_with_message(4000, 1200, KLM);
        let scan = scan(&chunk, 4.0);
        assert!(
            scan.candidates.contains(&1200),
            "true offset missing from {:?}",
            &scan.candidates[..scan.candidates.len().min(8)]
        );
    }

    #[test]
    fn test_scan_candidates_ascending() {
        let chunk = chunk_with_message(4000, 1200, KLM);
        let scan = scan(&chunk, 4.0);
        assert!(scan.candidates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_scan_noise_floor_is_chunk_mean() {
        let chunk = vec![5.0f32; 1000];
        let scan = scan(&chunk, 4.0);
        assert!((scan.noise_floor - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_scan_uniform_noise_yields_nothing() {
        // Uniform noise never reaches mean + 4 sigma, so no candidates
        let chunk = uniform_noise(100_000, 0x5EED);
        let scan = scan(&chunk, 4.0);
        assert!(
            scan.candidates.is_empty(),
            "{} false candidates in noise",
            scan.candidates.len()
        );
    }

    #[test]
    fn test_scan_short_chunk_yields_nothing() {
        let scan = scan(&[HI; 16], 4.0);
        assert!(scan.candidates.is_empty());
    }

    #[test]
    fn test_scan_empty_chunk() {
        let scan = scan(&[], 4.0);
        assert!(scan.candidates.is_empty());
        assert_eq!(scan.noise_floor, 0.0);
    }

    #[test]
    fn test_scan_stops_before_chunk_end() {
        // A lone spike in the last 16 samples must not be scanned
        let mut chunk = vec![1.0f32; 500];
        chunk[495] = 1000.0;
        let scan = scan(&chunk, 4.0);
        assert!(scan.candidates.is_empty());
    }

    #[test]
    fn test_demodulate_roundtrip_known_frame() {
        let window = encode_message(KLM);
        assert_eq!(demodulate(&window).as_deref(), Some(KLM));
    }

    #[test]
    fn test_demodulate_roundtrip_extremes() {
        for hex in [
            "0000000000000000000000000000",
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFF",
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAA",
            "5555555555555555555555555555",
        ] {
            let window = encode_message(hex);
            assert_eq!(demodulate(&window).as_deref(), Some(hex));
        }
    }

    #[test]
    fn test_demodulate_roundtrip_random_patterns() {
        let mut seed = 0x1090u64;
        for _ in 0..20 {
            let hex: String = (0..28)
                .map(|_| {
                    seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
                    char::from_digit((seed >> 33) as u32 % 16, 16)
                        .unwrap()
                        .to_ascii_uppercase()
                })
                .collect();
            let window = encode_message(&hex);
            assert_eq!(demodulate(&window).as_deref(), Some(hex.as_str()));
        }
    }

    #[test]
    fn test_demodulate_short_window_is_miss() {
        let window = encode_message(KLM);
        assert!(demodulate(&window[..WINDOW_SIZE - 1]).is_none());
        assert!(demodulate(&[]).is_none());
    }

    #[test]
    fn test_snr_db_exact() {
        let window = vec![100.0f32; 240];
        let snr = snr_db(&window, 10.0).unwrap();
        assert!((snr - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_snr_db_zero_floor_unavailable() {
        let window = vec![100.0f32; 240];
        assert!(snr_db(&window, 0.0).is_none());
    }

    #[test]
    fn test_snr_db_dead_window_unavailable() {
        assert!(snr_db(&[0.0; 240], 10.0).is_none());
        assert!(snr_db(&[], 10.0).is_none());
    }
}
