//! rtadsb-fields: Mode S / ADS-B message field extraction.
//!
//! No I/O, no state — just the encodings. The receiver core (`rtadsb-core`)
//! treats this crate as a black box: it hands over a CRC-checked hex
//! message and a reference position and gets typed values back. Everything
//! about the 1090 MHz field layout lives here and nowhere else.
//!
//! Surface:
//! - [`crc::remainder`] — CRC-24 integrity remainder
//! - [`fields::df`], [`fields::typecode`], [`fields::icao`] — dispatch keys
//! - [`fields::callsign`], [`fields::altitude`],
//!   [`fields::position_with_ref`], [`fields::velocity`] — payload fields

pub mod cpr;
pub mod crc;
pub mod fields;
pub mod types;

pub use fields::{SpeedType, Velocity};
pub use types::{hex_decode, hex_encode, icao_to_string, Icao};
