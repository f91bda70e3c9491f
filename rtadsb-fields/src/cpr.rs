//! Compact Position Reporting — reference-based (local) CPR decode.
//!
//! A single CPR frame is ambiguous on its own; resolving it against a
//! reference position within one zone (~180 nm airborne, ~45 nm surface)
//! picks the right zone index. This is the decode mode a fixed ground
//! station uses: the station's own coordinates are the reference.
//!
//! Key constants:
//! - NZ = 15 (latitude zones per hemisphere)
//! - Nb = 17 (bits per coordinate)
//! - airborne Dlat = 360 / (4 * NZ) = 6.0 degrees; surface frames encode
//!   over a 90 degree span, so every surface zone is a quarter the size

/// Number of latitude zones per hemisphere.
const NZ: f64 = 15.0;

/// Maximum CPR value (2^17).
const CPR_MAX: f64 = (1u32 << 17) as f64;

/// Number of longitude zones at a given latitude (NL function).
///
/// Ranges from 1 near the poles to 59 at the equator.
pub fn nl(lat: f64) -> i32 {
    if lat.abs() >= 87.0 {
        return 1;
    }

    let a = 1.0 - (std::f64::consts::PI / (2.0 * NZ)).cos();
    let b = (std::f64::consts::PI / 180.0 * lat.abs()).cos().powi(2);
    let nl_val = (2.0 * std::f64::consts::PI / (1.0 - a / b).acos()).floor() as i32;
    nl_val.max(1)
}

/// Modulo that always returns a non-negative result.
fn modulo(x: f64, y: f64) -> f64 {
    x - y * (x / y).floor()
}

/// Decode an airborne CPR frame against a reference position.
///
/// `odd` selects the frame format. Returns `(latitude, longitude)` in
/// degrees; the result is only meaningful when the true position lies
/// within half a zone of the reference.
pub fn airborne_local(
    cpr_lat: u32,
    cpr_lon: u32,
    odd: bool,
    ref_lat: f64,
    ref_lon: f64,
) -> (f64, f64) {
    local_decode(cpr_lat, cpr_lon, odd, ref_lat, ref_lon, 360.0)
}

/// Decode a surface CPR frame against a reference position.
///
/// Surface frames encode angles over a 90 degree span instead of 360, so
/// the zone sizes are a quarter of the airborne ones.
pub fn surface_local(
    cpr_lat: u32,
    cpr_lon: u32,
    odd: bool,
    ref_lat: f64,
    ref_lon: f64,
) -> (f64, f64) {
    local_decode(cpr_lat, cpr_lon, odd, ref_lat, ref_lon, 90.0)
}

fn local_decode(
    cpr_lat: u32,
    cpr_lon: u32,
    odd: bool,
    ref_lat: f64,
    ref_lon: f64,
    span: f64,
) -> (f64, f64) {
    let i = if odd { 1.0 } else { 0.0 };
    let lat_cpr = cpr_lat as f64 / CPR_MAX;
    let lon_cpr = cpr_lon as f64 / CPR_MAX;

    let dlat = span / (4.0 * NZ - i);
    let j = (ref_lat / dlat).floor() + (modulo(ref_lat, dlat) / dlat - lat_cpr + 0.5).floor();
    let lat = dlat * (j + lat_cpr);

    let nl_val = nl(lat) - if odd { 1 } else { 0 };
    let dlon = if nl_val > 0 {
        span / nl_val as f64
    } else {
        span
    };
    let m = (ref_lon / dlon).floor() + (modulo(ref_lon, dlon) / dlon - lon_cpr + 0.5).floor();
    let lon = dlon * (m + lon_cpr);

    (lat, lon)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nl_equator() {
        assert_eq!(nl(0.0), 59);
    }

    #[test]
    fn test_nl_poles() {
        assert_eq!(nl(87.0), 1);
        assert_eq!(nl(-90.0), 1);
    }

    #[test]
    fn test_nl_mid_latitude() {
        assert_eq!(nl(52.0), 36);
    }

    #[test]
    fn test_airborne_local_even() {
        // Even airborne frame 8D40621D58C382D690C8AC2863A7:
        // cpr_lat=93000, cpr_lon=51372, true position 52.2572, 3.91937
        let (lat, lon) = airborne_local(93000, 51372, false, 52.258, 3.918);
        assert!((lat - 52.25720).abs() < 1e-4, "lat {lat}");
        assert!((lon - 3.91937).abs() < 1e-4, "lon {lon}");
    }

    #[test]
    fn test_surface_local_even() {
        // Surface frame minted over Honolulu harbor: true 21.3187, -157.9224
        let (lat, lon) = surface_local(27848, 64470, false, 21.315603, -157.858093);
        assert!((lat - 21.3187).abs() < 1e-3, "lat {lat}");
        assert!((lon - -157.9224).abs() < 1e-3, "lon {lon}");
    }

    #[test]
    fn test_local_decode_tracks_reference_zone() {
        // Same CPR numbers against a far-away reference land in a
        // different zone, near that reference
        let (lat, _) = airborne_local(93000, 51372, false, -30.0, 100.0);
        assert!((lat - -30.0).abs() < 4.0);
    }
}
