//! The two-stage acquisition/decoding pipeline.
//!
//! Acquisition pulls fixed-size chunks from the sample source and pushes
//! them onto an unbounded channel; decoding blocks on that channel, runs
//! the decode path, and feeds the track registry. The stages only meet at
//! the channel and one shared stop flag, checked at each loop head — no
//! mid-operation cancellation, so an in-flight read or repair sweep
//! always completes before a stage exits.
//!
//! Backlog policy: after each chunk the decoding stage clears whatever
//! queued up behind it. The pipeline prefers fresh data over complete
//! data; a slow decode costs dropped chunks, never growing latency.
//!
//! The registry is confined to the decoding thread. External readers get
//! published snapshot copies through [`PipelineHandle`] — single writer,
//! no locks on the hot path.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::decoder::ChunkDecoder;
use crate::registry::{Track, TrackRegistry};
use crate::types::{Error, Packet, Result, SampleChunk};

/// How long the decoding stage waits on the channel before re-checking
/// the stop flag.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Collaborator seams
// ---------------------------------------------------------------------------

/// Blocking magnitude sample supplier (SDR driver, capture file, test
/// double). A returned error is terminal and stops the pipeline.
pub trait SampleSource: Send {
    fn read(&mut self, n: usize) -> Result<Vec<f32>>;
}

/// Receives every validated packet (log file, network feed). Write
/// failures are reported and ignored — a sink can never stall decoding.
pub trait PacketSink: Send {
    fn write(&mut self, packet: &Packet) -> io::Result<()>;
}

// ---------------------------------------------------------------------------
// Shared reporting state
// ---------------------------------------------------------------------------

/// Counters accumulated over the pipeline's lifetime.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PipelineStats {
    pub chunks: u64,
    pub chunks_dropped: u64,
    pub candidates: u64,
    pub packets: u64,
    pub repaired: u64,
    pub evicted: u64,
    pub tracks: usize,
}

struct Shared {
    tracks: Mutex<Vec<Track>>,
    recent: Mutex<VecDeque<Packet>>,
    stats: Mutex<PipelineStats>,
}

/// Cloneable read/control handle onto a running (or finished) pipeline.
#[derive(Clone)]
pub struct PipelineHandle {
    stop: Arc<AtomicBool>,
    shared: Arc<Shared>,
}

impl PipelineHandle {
    /// Latest published track snapshot, most recently heard first.
    pub fn tracks(&self) -> Vec<Track> {
        self.shared.tracks.lock().unwrap().clone()
    }

    /// The recent-packet ring, oldest first.
    pub fn recent_packets(&self) -> Vec<Packet> {
        self.shared.recent.lock().unwrap().iter().cloned().collect()
    }

    pub fn stats(&self) -> PipelineStats {
        *self.shared.stats.lock().unwrap()
    }

    /// Ask both stages to exit after their current blocking operation.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The running pipeline: two joined stages and their shared state.
pub struct Pipeline {
    handle: PipelineHandle,
    acquisition: thread::JoinHandle<()>,
    decoding: thread::JoinHandle<()>,
}

impl Pipeline {
    /// Validate the configuration and start both stages.
    pub fn spawn(
        source: Box<dyn SampleSource>,
        sink: Option<Box<dyn PacketSink>>,
        config: PipelineConfig,
    ) -> Result<Pipeline> {
        config.validate()?;

        let stop = Arc::new(AtomicBool::new(false));
        let shared = Arc::new(Shared {
            tracks: Mutex::new(Vec::new()),
            recent: Mutex::new(VecDeque::with_capacity(config.recent_capacity)),
            stats: Mutex::new(PipelineStats::default()),
        });
        let handle = PipelineHandle {
            stop: stop.clone(),
            shared: shared.clone(),
        };

        let (tx, rx) = crossbeam_channel::unbounded();
        let epoch = Instant::now();

        let acquisition = {
            let stop = stop.clone();
            let chunk_samples = config.chunk_samples;
            thread::Builder::new()
                .name("rtadsb-acquire".into())
                .spawn(move || acquisition_loop(source, tx, stop, epoch, chunk_samples))?
        };

        let decoding = {
            let stage = DecodeStage {
                decoder: ChunkDecoder::new(&config),
                registry: TrackRegistry::new(config.reference),
                sink,
                shared,
                epoch,
                config,
            };
            let stop = stop.clone();
            thread::Builder::new()
                .name("rtadsb-decode".into())
                .spawn(move || stage.run(rx, stop))?
        };

        Ok(Pipeline {
            handle,
            acquisition,
            decoding,
        })
    }

    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    /// Wait for both stages to finish (source exhaustion or a prior
    /// `stop`).
    pub fn join(self) {
        if self.acquisition.join().is_err() {
            log::error!("acquisition stage panicked");
        }
        if self.decoding.join().is_err() {
            log::error!("decoding stage panicked");
        }
    }

    /// Signal stop and wait for both stages.
    pub fn shutdown(self) {
        self.handle.stop();
        self.join();
    }
}

// ---------------------------------------------------------------------------
// Acquisition stage
// ---------------------------------------------------------------------------

fn acquisition_loop(
    mut source: Box<dyn SampleSource>,
    tx: Sender<SampleChunk>,
    stop: Arc<AtomicBool>,
    epoch: Instant,
    chunk_samples: usize,
) {
    while !stop.load(Ordering::Relaxed) {
        match source.read(chunk_samples) {
            Ok(samples) => {
                let chunk = SampleChunk {
                    samples,
                    timestamp: epoch.elapsed().as_secs_f64(),
                };
                if tx.send(chunk).is_err() {
                    break;
                }
            }
            Err(Error::Source(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                log::info!("sample source exhausted, stopping pipeline");
                stop.store(true, Ordering::Relaxed);
                break;
            }
            Err(e) => {
                log::error!("sample source failed, stopping pipeline: {e}");
                stop.store(true, Ordering::Relaxed);
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding stage
// ---------------------------------------------------------------------------

struct DecodeStage {
    decoder: ChunkDecoder,
    registry: TrackRegistry,
    sink: Option<Box<dyn PacketSink>>,
    shared: Arc<Shared>,
    epoch: Instant,
    config: PipelineConfig,
}

impl DecodeStage {
    fn run(mut self, rx: Receiver<SampleChunk>, stop: Arc<AtomicBool>) {
        while !stop.load(Ordering::Relaxed) {
            match rx.recv_timeout(RECV_TIMEOUT) {
                Ok(chunk) => self.step(chunk, &rx),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// One decoding iteration: decode a chunk, merge its packets, clear
    /// the backlog, evict stale tracks, publish.
    fn step(&mut self, chunk: SampleChunk, rx: &Receiver<SampleChunk>) {
        let outcome = self.decoder.decode(&chunk);
        let n_packets = outcome.packets.len() as u64;
        let n_repaired = outcome.packets.iter().filter(|p| p.repaired).count() as u64;

        for packet in outcome.packets {
            log::info!("{packet}");
            if let Some(sink) = self.sink.as_mut() {
                if let Err(e) = sink.write(&packet) {
                    log::warn!("packet sink write failed: {e}");
                }
            }
            self.registry.apply(&packet);

            let mut recent = self.shared.recent.lock().unwrap();
            if recent.len() == self.config.recent_capacity {
                recent.pop_front();
            }
            recent.push_back(packet);
        }

        let mut dropped = 0u64;
        if self.config.drop_backlog {
            while rx.try_recv().is_ok() {
                dropped += 1;
            }
        }

        let now = self.epoch.elapsed().as_secs_f64();
        let evicted = self.registry.evict(now, self.config.track_ttl) as u64;

        *self.shared.tracks.lock().unwrap() = self.registry.snapshot();

        let mut stats = self.shared.stats.lock().unwrap();
        stats.chunks += 1;
        stats.chunks_dropped += dropped;
        stats.candidates += outcome.candidates as u64;
        stats.packets += n_packets;
        stats.repaired += n_repaired;
        stats.evicted += evicted;
        stats.tracks = self.registry.len();

        log::debug!(
            "chunk @{:.3}s: floor {:.1}, {} candidates, {} packets, {} tracks, {} backlog dropped",
            chunk.timestamp,
            outcome.noise_floor,
            outcome.candidates,
            n_packets,
            stats.tracks,
            dropped
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
