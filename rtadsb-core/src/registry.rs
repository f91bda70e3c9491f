//! Aircraft track registry.
//!
//! One `Track` per transmitter address, merged from every packet that
//! address sends and evicted after `ttl` seconds of silence. The registry
//! is owned by the decoding stage alone — single writer, no locking —
//! and external readers only ever see `snapshot()` copies.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use serde::Serialize;

use rtadsb_fields::{fields, Icao};

use crate::types::Packet;

// Typecode dispatch boundaries. Fixed by the extended-squitter format;
// named so the ranges can't silently drift apart.
pub const CALLSIGN_TYPECODES: RangeInclusive<u8> = 1..=4;
pub const SURFACE_TYPECODES: RangeInclusive<u8> = 5..=8;
pub const AIRBORNE_TYPECODES: RangeInclusive<u8> = 9..=18;
pub const VELOCITY_TYPECODE: u8 = 19;

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// Live state for one tracked aircraft.
///
/// The transmitter id is fixed for the track's lifetime, as is the
/// reference position captured at creation; everything else fills in as
/// packets arrive.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    pub transmitter_id: Icao,
    pub callsign: Option<String>,
    pub altitude: Option<i32>,
    pub velocity: Option<f64>,
    pub heading: Option<f64>,
    pub position: Option<(f64, f64)>,
    /// Ground station position used for CPR resolution, fixed at creation.
    pub reference: (f64, f64),
    /// Monotonic seconds; non-decreasing over the track's lifetime.
    pub last_update: f64,
    pub messages: u64,
}

impl Track {
    fn new(transmitter_id: Icao, reference: (f64, f64), timestamp: f64) -> Self {
        Track {
            transmitter_id,
            callsign: None,
            altitude: None,
            velocity: None,
            heading: None,
            position: None,
            reference,
            last_update: timestamp,
            messages: 0,
        }
    }

    /// Seconds since the last packet from this aircraft.
    pub fn age(&self, now: f64) -> f64 {
        now - self.last_update
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Keyed store of aircraft tracks.
pub struct TrackRegistry {
    tracks: HashMap<Icao, Track>,
    reference: (f64, f64),
}

impl TrackRegistry {
    pub fn new(reference: (f64, f64)) -> Self {
        TrackRegistry {
            tracks: HashMap::new(),
            reference,
        }
    }

    /// Merge a validated packet into its track, creating the track on
    /// first contact.
    ///
    /// Dispatch is by typecode range: 1-4 callsign, 5-8 surface
    /// (altitude + position + movement), 9-18 airborne position, 19
    /// velocity. Short squitters and unmatched typecodes refresh
    /// `last_update` only — that silence is deliberate, not an error.
    /// Packets with no derivable transmitter address are ignored.
    pub fn apply(&mut self, packet: &Packet) {
        let Some(id) = packet.transmitter_id else {
            return;
        };

        let track = self
            .tracks
            .entry(id)
            .or_insert_with(|| Track::new(id, self.reference, packet.timestamp));
        track.last_update = packet.timestamp;
        track.messages += 1;

        if packet.is_short {
            // Short squitters carry no decodable payload in this profile
            return;
        }
        let Some(tc) = packet.typecode else {
            return;
        };

        let msg = packet.message.as_str();
        let (ref_lat, ref_lon) = track.reference;

        match tc {
            tc if CALLSIGN_TYPECODES.contains(&tc) => {
                if let Some(cs) = fields::callsign(msg) {
                    track.callsign = Some(cs.trim().to_string());
                }
            }
            tc if SURFACE_TYPECODES.contains(&tc) => {
                if let Some(alt) = fields::altitude(msg) {
                    track.altitude = Some(alt);
                }
                if let Some(pos) = fields::position_with_ref(msg, ref_lat, ref_lon) {
                    track.position = Some(pos);
                }
                if let Some(vel) = fields::velocity(msg) {
                    if let Some(speed) = vel.speed_kts {
                        track.velocity = Some(speed);
                    }
                    if let Some(heading) = vel.heading_deg {
                        track.heading = Some(heading);
                    }
                }
            }
            tc if AIRBORNE_TYPECODES.contains(&tc) => {
                if let Some(alt) = fields::altitude(msg) {
                    track.altitude = Some(alt);
                }
                if let Some(pos) = fields::position_with_ref(msg, ref_lat, ref_lon) {
                    track.position = Some(pos);
                }
            }
            VELOCITY_TYPECODE => {
                if let Some(vel) = fields::velocity(msg) {
                    if let Some(speed) = vel.speed_kts {
                        track.velocity = Some(speed);
                    }
                    if let Some(heading) = vel.heading_deg {
                        track.heading = Some(heading);
                    }
                }
            }
            _ => {}
        }
    }

    /// Drop every track silent for `ttl` seconds or more. Returns the
    /// number evicted. Runs once per decoding iteration, so eviction
    /// cadence equals chunk cadence.
    pub fn evict(&mut self, now: f64, ttl: f64) -> usize {
        let before = self.tracks.len();
        self.tracks.retain(|_, track| now - track.last_update < ttl);
        before - self.tracks.len()
    }

    /// Read-consistent copy of every current track, most recently heard
    /// first.
    pub fn snapshot(&self) -> Vec<Track> {
        let mut tracks: Vec<Track> = self.tracks.values().cloned().collect();
        tracks.sort_by(|a, b| {
            b.last_update
                .partial_cmp(&a.last_update)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        tracks
    }

    pub fn get(&self, id: &Icao) -> Option<&Track> {
        self.tracks.get(id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
