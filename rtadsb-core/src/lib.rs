//! rtadsb-core: 1090 MHz ADS-B receiver core.
//!
//! Everything between raw magnitude samples and live aircraft tracks:
//! adaptive preamble detection, Manchester demodulation, CRC validation
//! with optional single-bit repair, SNR estimation, the two-stage
//! acquisition/decoding pipeline, and the TTL-bounded track registry.
//!
//! I/O enters and leaves only through the [`pipeline::SampleSource`] and
//! [`pipeline::PacketSink`] seams; field encodings live behind the
//! `rtadsb-fields` crate. This crate owns signal recovery and track
//! lifecycle, nothing else.

pub mod config;
pub mod decoder;
pub mod demod;
pub mod pipeline;
pub mod registry;
pub mod types;
pub mod validate;

// Re-export commonly used types at crate root
pub use config::PipelineConfig;
pub use decoder::ChunkDecoder;
pub use pipeline::{PacketSink, Pipeline, PipelineHandle, PipelineStats, SampleSource};
pub use registry::{Track, TrackRegistry};
pub use types::{Error, Packet, Result, SampleChunk};
pub use validate::{MessageForm, ValidatedMessage};
