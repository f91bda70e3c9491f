//! rtadsb: realtime 1090 MHz ADS-B decoder and aircraft tracker.
//!
//! Replays raw IQ captures through the receiver pipeline. Set `RUST_LOG`
//! to see per-packet lines (`info`) or per-chunk scan summaries
//! (`debug`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};

use rtadsb_core::config;
use rtadsb_core::{ChunkDecoder, Pipeline, PipelineConfig, SampleChunk, SampleSource, Track};
use rtadsb_fields::icao_to_string;

mod sink;
mod source;

#[derive(Parser)]
#[command(
    name = "rtadsb",
    version,
    about = "Realtime 1090 MHz ADS-B decoder and aircraft tracker"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an IQ capture and track aircraft
    Track {
        /// Raw IQ capture (interleaved unsigned 8-bit pairs)
        file: PathBuf,

        /// Sample rate in Hz
        #[arg(long, default_value_t = config::DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        /// Ground station latitude used to resolve positions
        #[arg(long)]
        ref_lat: Option<f64>,

        /// Ground station longitude
        #[arg(long)]
        ref_lon: Option<f64>,

        /// Seconds of silence before a track is dropped
        #[arg(long, default_value_t = config::DEFAULT_TRACK_TTL)]
        ttl: f64,

        /// Attempt single-bit repair of CRC failures (slow)
        #[arg(long)]
        repair: bool,

        /// Detector threshold in standard deviations above the mean
        #[arg(long, default_value_t = config::DEFAULT_THRESHOLD_SIGMA)]
        threshold: f32,

        /// Append validated packets to this log file
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Decode every chunk instead of preferring fresh data
        #[arg(long)]
        keep_backlog: bool,

        /// Chunk length in seconds
        #[arg(long, default_value_t = 1.0)]
        chunk_seconds: f64,

        /// Print the final tracks as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Demodulate an IQ capture and print validated messages, no tracking
    Demod {
        /// Raw IQ capture (interleaved unsigned 8-bit pairs)
        file: PathBuf,

        /// Sample rate in Hz
        #[arg(long, default_value_t = config::DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        /// Attempt single-bit repair of CRC failures (slow)
        #[arg(long)]
        repair: bool,

        /// Detector threshold in standard deviations above the mean
        #[arg(long, default_value_t = config::DEFAULT_THRESHOLD_SIGMA)]
        threshold: f32,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Track {
            file,
            sample_rate,
            ref_lat,
            ref_lon,
            ttl,
            repair,
            threshold,
            log_file,
            keep_backlog,
            chunk_seconds,
            json,
        } => {
            let reference = match (ref_lat, ref_lon) {
                (Some(lat), Some(lon)) => (lat, lon),
                _ => config::DEFAULT_REFERENCE,
            };
            let config = PipelineConfig {
                chunk_samples: (sample_rate as f64 * chunk_seconds) as usize,
                sample_rate,
                reference,
                track_ttl: ttl,
                repair,
                threshold_sigma: threshold,
                drop_backlog: !keep_backlog,
                ..Default::default()
            };
            cmd_track(file, config, log_file, json);
        }
        Commands::Demod {
            file,
            sample_rate,
            repair,
            threshold,
        } => {
            let config = PipelineConfig {
                sample_rate,
                repair,
                threshold_sigma: threshold,
                ..Default::default()
            };
            cmd_demod(file, config);
        }
    }
}

fn cmd_track(file: PathBuf, config: PipelineConfig, log_file: Option<PathBuf>, json: bool) {
    log::info!(
        "tracking from {} at {} Hz, reference ({:.4}, {:.4}), ttl {}s",
        file.display(),
        config.sample_rate,
        config.reference.0,
        config.reference.1,
        config.track_ttl
    );

    let source = source::IqFileSource::open(&file).unwrap_or_else(|e| {
        eprintln!("Error opening {}: {e}", file.display());
        std::process::exit(1);
    });

    let sink: Option<Box<dyn rtadsb_core::PacketSink>> = match log_file {
        Some(path) => {
            let sink = sink::LogFileSink::open(&path).unwrap_or_else(|e| {
                eprintln!("Error opening log {}: {e}", path.display());
                std::process::exit(1);
            });
            Some(Box::new(sink))
        }
        None => None,
    };

    let pipeline = Pipeline::spawn(Box::new(source), sink, config).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    let handle = pipeline.handle();
    pipeline.join();

    let stats = handle.stats();
    let tracks = handle.tracks();

    if json {
        println!("{}", serde_json::to_string_pretty(&tracks).unwrap());
        return;
    }

    eprintln!(
        "{} chunks ({} dropped), {} candidates, {} packets ({} repaired), {} aircraft",
        stats.chunks,
        stats.chunks_dropped,
        stats.candidates,
        stats.packets,
        stats.repaired,
        tracks.len()
    );

    if !tracks.is_empty() {
        println!("{}", track_table(&tracks));
    }
}

fn cmd_demod(file: PathBuf, config: PipelineConfig) {
    let mut source = source::IqFileSource::open(&file).unwrap_or_else(|e| {
        eprintln!("Error opening {}: {e}", file.display());
        std::process::exit(1);
    });

    let decoder = ChunkDecoder::new(&config);
    let mut timestamp = 0.0f64;
    let mut total = 0u64;

    loop {
        let samples = match source.read(config.chunk_samples) {
            Ok(s) => s,
            Err(_) => break,
        };
        let elapsed = samples.len() as f64 / config.sample_rate as f64;
        let outcome = decoder.decode(&SampleChunk { samples, timestamp });
        for packet in outcome.packets {
            println!("{packet}");
            total += 1;
        }
        timestamp += elapsed;
    }

    eprintln!("{total} validated messages");
}

fn track_table(tracks: &[Track]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "ICAO", "Callsign", "Lat", "Lon", "Alt (ft)", "Speed", "Hdg", "Last (s)", "Msgs",
    ]);

    for track in tracks {
        table.add_row(vec![
            Cell::new(icao_to_string(&track.transmitter_id)),
            Cell::new(track.callsign.as_deref().unwrap_or("-")),
            Cell::new(
                track
                    .position
                    .map(|(lat, _)| format!("{lat:.4}"))
                    .unwrap_or("-".into()),
            ),
            Cell::new(
                track
                    .position
                    .map(|(_, lon)| format!("{lon:.4}"))
                    .unwrap_or("-".into()),
            ),
            Cell::new(
                track
                    .altitude
                    .map(|a| a.to_string())
                    .unwrap_or("-".into()),
            ),
            Cell::new(
                track
                    .velocity
                    .map(|s| format!("{s:.0}"))
                    .unwrap_or("-".into()),
            ),
            Cell::new(
                track
                    .heading
                    .map(|h| format!("{h:.1}"))
                    .unwrap_or("-".into()),
            ),
            Cell::new(format!("{:.1}", track.last_update)),
            Cell::new(track.messages),
        ]);
    }

    table
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
