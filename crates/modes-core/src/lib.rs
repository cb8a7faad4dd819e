//! Mode S / ADS-B decoding core: magnitude LUT, demodulator, CRC and error
//! correction, frame decoder, CPR position resolver, ICAO address cache and
//! the in-memory aircraft tracker.

pub mod aircraft;
pub mod cpr;
pub mod crc;
pub mod demod;
pub mod error;
pub mod icao_cache;
pub mod magnitude;
pub mod message;
pub mod sbs;

pub mod prelude {
    pub use crate::aircraft::{Aircraft, AircraftTracker, ShowState};
    pub use crate::cpr::{airborne_position, Position};
    pub use crate::demod::{detect, Candidate};
    pub use crate::error::Error;
    pub use crate::icao_cache::IcaoCache;
    pub use crate::magnitude::MagnitudeLut;
    pub use crate::message::{decode_message, parse_raw_line, AltitudeUnit, ModeSMessage};
    pub use crate::sbs;
}
