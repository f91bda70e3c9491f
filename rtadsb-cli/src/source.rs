//! File-backed sample sources.
//!
//! RTL-SDR captures are interleaved unsigned 8-bit IQ pairs
//! `[I0, Q0, I1, Q1, ...]`. Magnitude conversion goes through a 256x256
//! lookup table so the per-sample cost is one index.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::sync::LazyLock;

use rtadsb_core::{Result, SampleSource};

/// Pre-computed magnitude for all 256x256 IQ combinations:
/// `MAG_LUT[i * 256 + q] = sqrt((i - 127.5)^2 + (q - 127.5)^2)`
static MAG_LUT: LazyLock<Vec<f32>> = LazyLock::new(|| {
    let mut lut = vec![0.0f32; 256 * 256];
    for i in 0..256u32 {
        let iv = i as f32 - 127.5;
        for q in 0..256u32 {
            let qv = q as f32 - 127.5;
            lut[(i * 256 + q) as usize] = (iv * iv + qv * qv).sqrt();
        }
    }
    lut
});

/// Convert interleaved uint8 IQ pairs to magnitudes, one f32 per pair.
pub fn iq_to_magnitude(raw: &[u8]) -> Vec<f32> {
    let n = raw.len() / 2;
    let lut = &*MAG_LUT;
    let mut mag = Vec::with_capacity(n);
    for i in 0..n {
        let idx = raw[i * 2] as usize * 256 + raw[i * 2 + 1] as usize;
        mag.push(lut[idx]);
    }
    mag
}

/// Replays a raw IQ capture file as a blocking sample source.
///
/// The final partial chunk is delivered as-is; the read after that
/// reports exhaustion, which stops the pipeline.
pub struct IqFileSource {
    reader: BufReader<File>,
}

impl IqFileSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(IqFileSource {
            reader: BufReader::new(File::open(path)?),
        })
    }
}

impl SampleSource for IqFileSource {
    fn read(&mut self, n: usize) -> Result<Vec<f32>> {
        let mut buf = vec![0u8; n * 2];
        let mut filled = 0;
        while filled < buf.len() {
            let count = self.reader.read(&mut buf[filled..])?;
            if count == 0 {
                break;
            }
            filled += count;
        }

        if filled == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "end of capture").into());
        }
        Ok(iq_to_magnitude(&buf[..filled]))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mag_lut_center() {
        // (127, 128): sqrt(0.25 + 0.25) ~ 0.707
        let mag = iq_to_magnitude(&[127, 128]);
        assert!((mag[0] - 0.7071).abs() < 0.001);
    }

    #[test]
    fn test_mag_lut_corner() {
        // (0, 0): sqrt(2) * 127.5 ~ 180.31
        let mag = iq_to_magnitude(&[0, 0]);
        assert!((mag[0] - 180.31).abs() < 0.01);
    }

    #[test]
    fn test_iq_to_magnitude_length() {
        assert_eq!(iq_to_magnitude(&[128u8; 200]).len(), 100);
    }

    #[test]
    fn test_file_source_chunking_and_exhaustion() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[128u8; 100]).unwrap(); // 50 IQ pairs
        file.flush().unwrap();

        let mut source = IqFileSource::open(file.path()).unwrap();
        assert_eq!(source.read(30).unwrap().len(), 30);
        // Partial final chunk
        assert_eq!(source.read(30).unwrap().len(), 20);
        // Then exhaustion
        assert!(source.read(30).is_err());
    }
}
