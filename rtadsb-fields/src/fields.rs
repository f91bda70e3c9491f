//! Typed field extraction from validated Mode S / ADS-B hex messages.
//!
//! Every function takes the hex string of an already CRC-checked message
//! and returns `Some(value)` or `None` — a missing or unparseable field is
//! an expected outcome, not an error. Callers dispatch on `df`/`typecode`
//! and pull only the fields that message class carries:
//! - TC 1-4:  `callsign`
//! - TC 5-8:  `altitude` (ground), `position_with_ref`, `velocity` (movement)
//! - TC 9-18: `altitude`, `position_with_ref`
//! - TC 19:   `velocity`

use serde::Serialize;

use crate::cpr;
use crate::crc;
use crate::types::{icao_from_hex, icao_from_u32, Icao, CALLSIGN_CHARSET};

const LONG_HEX_DIGITS: usize = 28;

// DFs where the address is explicit in bytes 1-3
const DF_EXPLICIT_ICAO: &[u8] = &[11, 17, 18];
// DFs where the address is recovered from the CRC remainder
const DF_RESIDUAL_ICAO: &[u8] = &[0, 4, 5, 16, 20, 21];

/// Downlink Format — top 5 bits of the first byte.
pub fn df(msg_hex: &str) -> Option<u8> {
    let first = u8::from_str_radix(msg_hex.get(0..2)?, 16).ok()?;
    Some((first >> 3) & 0x1F)
}

/// ADS-B Type Code — top 5 bits of the ME field. `None` unless the message
/// is a long DF17/18 squitter.
pub fn typecode(msg_hex: &str) -> Option<u8> {
    if msg_hex.len() != LONG_HEX_DIGITS || !matches!(df(msg_hex)?, 17 | 18) {
        return None;
    }
    let byte = u8::from_str_radix(msg_hex.get(8..10)?, 16).ok()?;
    Some((byte >> 3) & 0x1F)
}

/// Transmitter address.
///
/// Explicit in bytes 1-3 for DF11/17/18; recovered from the CRC remainder
/// for the interrogation-reply DFs. `None` for unrecognized formats.
pub fn icao(msg_hex: &str) -> Option<Icao> {
    let df = df(msg_hex)?;
    if DF_EXPLICIT_ICAO.contains(&df) {
        icao_from_hex(msg_hex.get(2..8)?)
    } else if DF_RESIDUAL_ICAO.contains(&df) {
        crc::remainder(msg_hex).map(icao_from_u32)
    } else {
        None
    }
}

/// The 56-bit ME field of a long squitter as an integer.
fn me_bits(msg_hex: &str) -> Option<u64> {
    if msg_hex.len() != LONG_HEX_DIGITS {
        return None;
    }
    u64::from_str_radix(msg_hex.get(8..22)?, 16).ok()
}

// ---------------------------------------------------------------------------
// Identification
// ---------------------------------------------------------------------------

/// TC 1-4: callsign, 8 characters, 6 bits each. Padding characters are
/// kept; callers trim.
pub fn callsign(msg_hex: &str) -> Option<String> {
    let tc = typecode(msg_hex)?;
    if !(1..=4).contains(&tc) {
        return None;
    }

    let bits = me_bits(msg_hex)?;
    let mut callsign = String::with_capacity(8);
    for i in 0..8 {
        let idx = ((bits >> (42 - i * 6)) & 0x3F) as usize;
        callsign.push(CALLSIGN_CHARSET[idx] as char);
    }
    Some(callsign)
}

// ---------------------------------------------------------------------------
// Altitude
// ---------------------------------------------------------------------------

/// Altitude in feet from a position squitter.
///
/// TC 5-8 are surface reports with no altitude field — ground level (0 ft)
/// by convention. TC 9-18 carry a 12-bit barometric code; TC 20-22 use the
/// same layout for GNSS height.
pub fn altitude(msg_hex: &str) -> Option<i32> {
    let tc = typecode(msg_hex)?;
    match tc {
        5..=8 => Some(0),
        9..=18 | 20..=22 => {
            let bits = me_bits(msg_hex)?;
            decode_altitude_code(((bits >> 36) & 0x0FFF) as u32)
        }
        _ => None,
    }
}

/// Decode the 12-bit altitude code. The Q-bit selects 25-ft linear
/// encoding; Q=0 falls back to the 100-ft Gillham gray code.
fn decode_altitude_code(alt_code: u32) -> Option<i32> {
    if alt_code == 0 {
        return None;
    }

    let q_bit = (alt_code >> 4) & 1;
    if q_bit == 1 {
        let n = ((alt_code >> 5) << 4) | (alt_code & 0x0F);
        Some(n as i32 * 25 - 1000)
    } else {
        decode_gillham(alt_code)
    }
}

/// 100-ft Gillham gray code altitude (the pre-Mode-S encoding).
fn decode_gillham(alt_code: u32) -> Option<i32> {
    let c1 = (alt_code >> 12) & 1;
    let a1 = (alt_code >> 11) & 1;
    let c2 = (alt_code >> 10) & 1;
    let a2 = (alt_code >> 9) & 1;
    let c4 = (alt_code >> 8) & 1;
    let a4 = (alt_code >> 7) & 1;
    let b1 = (alt_code >> 5) & 1;
    let b2 = (alt_code >> 3) & 1;
    let b4 = (alt_code >> 1) & 1;

    // 100-ft component: gray-coded C digit
    let mut c_bin = c4 * 4 + c2 * 2 + c1;
    c_bin ^= c_bin >> 2;
    c_bin ^= c_bin >> 1;
    if c_bin == 0 || c_bin >= 6 {
        return None;
    }

    // 500-ft component: gray code over the combined A and B digits
    let ab_gray = (a4 * 4 + a2 * 2 + a1) << 3 | (b4 * 4 + b2 * 2 + b1);
    let mut ab_bin = ab_gray;
    ab_bin ^= ab_bin >> 4;
    ab_bin ^= ab_bin >> 2;
    ab_bin ^= ab_bin >> 1;

    let altitude = ab_bin as i32 * 500 + c_bin as i32 * 100 - 1200;
    if !(-1200..=126750).contains(&altitude) {
        return None;
    }
    Some(altitude)
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// CPR-decoded position from a single position squitter, resolved against
/// a reference within one zone of the true position.
///
/// TC 5-8 use the surface encoding, TC 9-18/20-22 the airborne one.
pub fn position_with_ref(msg_hex: &str, ref_lat: f64, ref_lon: f64) -> Option<(f64, f64)> {
    let tc = typecode(msg_hex)?;
    let bits = me_bits(msg_hex)?;

    let odd = (bits >> 34) & 1 == 1;
    let cpr_lat = ((bits >> 17) & 0x1FFFF) as u32;
    let cpr_lon = (bits & 0x1FFFF) as u32;

    match tc {
        5..=8 => Some(cpr::surface_local(cpr_lat, cpr_lon, odd, ref_lat, ref_lon)),
        9..=18 | 20..=22 => Some(cpr::airborne_local(cpr_lat, cpr_lon, odd, ref_lat, ref_lon)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Velocity
// ---------------------------------------------------------------------------

/// How a velocity figure was measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpeedType {
    Ground,
    IAS,
    TAS,
    Surface,
}

impl std::fmt::Display for SpeedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeedType::Ground => write!(f, "ground"),
            SpeedType::IAS => write!(f, "IAS"),
            SpeedType::TAS => write!(f, "TAS"),
            SpeedType::Surface => write!(f, "surface"),
        }
    }
}

/// Speed, heading and vertical rate from a velocity-bearing squitter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Velocity {
    pub speed_kts: Option<f64>,
    pub heading_deg: Option<f64>,
    pub vertical_rate_fpm: Option<i32>,
    pub speed_type: SpeedType,
}

/// Velocity from TC 19 (airborne, subtypes 1-4) or TC 5-8 (surface
/// movement field). `None` for every other message class.
pub fn velocity(msg_hex: &str) -> Option<Velocity> {
    let tc = typecode(msg_hex)?;
    let bits = me_bits(msg_hex)?;

    match tc {
        5..=8 => Some(surface_movement(bits)),
        19 => {
            let subtype = ((bits >> 48) & 0x07) as u8;
            match subtype {
                1 | 2 => Some(ground_velocity(bits)),
                3 | 4 => Some(airspeed(bits)),
                _ => None,
            }
        }
        _ => None,
    }
}

fn ground_velocity(bits: u64) -> Velocity {
    let ew_dir = (bits >> 42) & 1; // 0=East, 1=West
    let ew_vel = ((bits >> 32) & 0x3FF) as i32 - 1;
    let ns_dir = (bits >> 31) & 1; // 0=North, 1=South
    let ns_vel = ((bits >> 21) & 0x3FF) as i32 - 1;

    let (speed, heading) = if ew_vel >= 0 && ns_vel >= 0 {
        let vx = if ew_dir == 1 { -ew_vel } else { ew_vel } as f64;
        let vy = if ns_dir == 1 { -ns_vel } else { ns_vel } as f64;
        let spd = (vx * vx + vy * vy).sqrt();
        let hdg = vx.atan2(vy).to_degrees().rem_euclid(360.0);
        (Some(round2(spd)), Some(round2(hdg)))
    } else {
        (None, None)
    };

    Velocity {
        speed_kts: speed,
        heading_deg: heading,
        vertical_rate_fpm: vertical_rate(bits),
        speed_type: SpeedType::Ground,
    }
}

fn airspeed(bits: u64) -> Velocity {
    let hdg_available = (bits >> 42) & 1;
    let hdg_raw = ((bits >> 32) & 0x3FF) as u32;
    let tas_bit = (bits >> 31) & 1; // 0=IAS, 1=TAS
    let speed_raw = ((bits >> 21) & 0x3FF) as i32;

    let heading = if hdg_available == 1 {
        Some(round2(hdg_raw as f64 * 360.0 / 1024.0))
    } else {
        None
    };
    let speed = if speed_raw > 0 {
        Some((speed_raw - 1) as f64)
    } else {
        None
    };

    Velocity {
        speed_kts: speed,
        heading_deg: heading,
        vertical_rate_fpm: vertical_rate(bits),
        speed_type: if tas_bit == 1 {
            SpeedType::TAS
        } else {
            SpeedType::IAS
        },
    }
}

fn vertical_rate(bits: u64) -> Option<i32> {
    let vr_sign = (bits >> 19) & 1; // 0=up, 1=down
    let vr_val = ((bits >> 10) & 0x1FF) as i32 - 1;
    if vr_val >= 0 {
        let rate = vr_val * 64;
        Some(if vr_sign == 1 { -rate } else { rate })
    } else {
        None
    }
}

/// Surface movement: 7-bit piecewise speed code plus ground track.
fn surface_movement(bits: u64) -> Velocity {
    let mov = ((bits >> 44) & 0x7F) as u32;
    let trk_valid = (bits >> 43) & 1 == 1;
    let trk = ((bits >> 36) & 0x7F) as u32;

    let speed = movement_speed(mov);
    let heading = if trk_valid {
        Some(round2(trk as f64 * 360.0 / 128.0))
    } else {
        None
    };

    Velocity {
        speed_kts: speed,
        heading_deg: heading,
        vertical_rate_fpm: None,
        speed_type: SpeedType::Surface,
    }
}

/// Piecewise-linear surface movement code to knots. 0 and the reserved
/// codes carry no information.
fn movement_speed(mov: u32) -> Option<f64> {
    let kts = match mov {
        1 => 0.0,
        2..=8 => 0.125 + (mov - 2) as f64 * 0.125,
        9..=12 => 1.0 + (mov - 9) as f64 * 0.25,
        13..=38 => 2.0 + (mov - 13) as f64 * 0.5,
        39..=93 => 15.0 + (mov - 39) as f64,
        94..=108 => 70.0 + (mov - 94) as f64 * 2.0,
        109..=123 => 100.0 + (mov - 109) as f64 * 5.0,
        124 => 175.0,
        _ => return None,
    };
    Some(kts)
}

/// Round to 2 decimal places.
fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::icao_to_string;

    const IDENT: &str = "8D4840D6202CC371C32CE0576098";
    const POS_EVEN: &str = "8D40621D58C382D690C8AC2863A7";
    const VEL_GROUND: &str = "8D485020994409940838175B284F";
    const SURFACE: &str = "8CA4E94A3A9A00D990FBD6B4930D";
    const SHORT_DF11: &str = "5DA4E94A3A9C3A";

    #[test]
    fn test_df() {
        assert_eq!(df(IDENT), Some(17));
        assert_eq!(df(SHORT_DF11), Some(11));
        assert_eq!(df(""), None);
    }

    #[test]
    fn test_typecode() {
        assert_eq!(typecode(IDENT), Some(4));
        assert_eq!(typecode(POS_EVEN), Some(11));
        assert_eq!(typecode(VEL_GROUND), Some(19));
        assert_eq!(typecode(SURFACE), Some(7));
        assert_eq!(typecode(SHORT_DF11), None);
    }

    #[test]
    fn test_icao_explicit() {
        assert_eq!(icao_to_string(&icao(IDENT).unwrap()), "4840D6");
        assert_eq!(icao_to_string(&icao(SHORT_DF11).unwrap()), "A4E94A");
    }

    #[test]
    fn test_callsign() {
        assert_eq!(callsign(IDENT).as_deref(), Some("KLM1023 "));
        assert_eq!(
            callsign("8D406B902015A678D4D220AA4BDA").as_deref(),
            Some("EZY85MH ")
        );
    }

    #[test]
    fn test_callsign_wrong_typecode() {
        assert!(callsign(POS_EVEN).is_none());
    }

    #[test]
    fn test_altitude_airborne() {
        assert_eq!(altitude(POS_EVEN), Some(38000));
    }

    #[test]
    fn test_altitude_surface_is_ground_level() {
        assert_eq!(altitude(SURFACE), Some(0));
    }

    #[test]
    fn test_altitude_code_25ft() {
        // 0xC38: Q=1, n=1560 → 1560*25 - 1000 = 38000
        assert_eq!(decode_altitude_code(0xC38), Some(38000));
    }

    #[test]
    fn test_altitude_code_zero() {
        assert_eq!(decode_altitude_code(0), None);
    }

    #[test]
    fn test_gillham_range() {
        for code in 0..0x1000u32 {
            if (code >> 4) & 1 == 1 {
                continue; // skip 25-ft mode
            }
            if let Some(alt) = decode_altitude_code(code) {
                assert!(
                    (-1200..=126750).contains(&alt),
                    "code 0x{code:03X} gave {alt}"
                );
            }
        }
    }

    #[test]
    fn test_position_airborne_with_ref() {
        let (lat, lon) = position_with_ref(POS_EVEN, 52.258, 3.918).unwrap();
        assert!((lat - 52.25720).abs() < 1e-4);
        assert!((lon - 3.91937).abs() < 1e-4);
    }

    #[test]
    fn test_position_surface_with_ref() {
        let (lat, lon) = position_with_ref(SURFACE, 21.315603, -157.858093).unwrap();
        assert!((lat - 21.3187).abs() < 1e-3, "lat {lat}");
        assert!((lon - -157.9224).abs() < 1e-3, "lon {lon}");
    }

    #[test]
    fn test_position_wrong_typecode() {
        assert!(position_with_ref(IDENT, 0.0, 0.0).is_none());
    }

    #[test]
    fn test_velocity_ground() {
        let vel = velocity(VEL_GROUND).unwrap();
        assert_eq!(vel.speed_kts, Some(159.2));
        assert_eq!(vel.heading_deg, Some(182.88));
        assert_eq!(vel.vertical_rate_fpm, Some(-832));
        assert_eq!(vel.speed_type, SpeedType::Ground);
    }

    #[test]
    fn test_velocity_surface_movement() {
        // Movement code 41 = 17 kt, track 32/128 = 90 degrees
        let vel = velocity(SURFACE).unwrap();
        assert_eq!(vel.speed_kts, Some(17.0));
        assert_eq!(vel.heading_deg, Some(90.0));
        assert_eq!(vel.vertical_rate_fpm, None);
        assert_eq!(vel.speed_type, SpeedType::Surface);
    }

    #[test]
    fn test_velocity_wrong_typecode() {
        assert!(velocity(IDENT).is_none());
    }

    #[test]
    fn test_movement_speed_table() {
        assert_eq!(movement_speed(0), None);
        assert_eq!(movement_speed(1), Some(0.0));
        assert_eq!(movement_speed(2), Some(0.125));
        assert_eq!(movement_speed(13), Some(2.0));
        assert_eq!(movement_speed(39), Some(15.0));
        assert_eq!(movement_speed(94), Some(70.0));
        assert_eq!(movement_speed(124), Some(175.0));
        assert_eq!(movement_speed(127), None);
    }
}
