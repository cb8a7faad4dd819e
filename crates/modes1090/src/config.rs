//! Environment-derived configuration: the receiver's home position.
//!
//! Grounded on `jet1090/source.rs`'s `Position::from_str` query-string
//! parsing pattern, adapted to the plain `"<lat>,<lon>"` form
//! `DUMP1090_HOMEPOS` actually uses.

use modes_core::prelude::{Error, Position};

/// Parse `DUMP1090_HOMEPOS` (spec ss6). Absent env var is not an error:
/// callers treat `None` as "home position unset" and report `lat:0,lon:0`.
pub fn home_position_from_env() -> Result<Option<Position>, Error> {
    match std::env::var("DUMP1090_HOMEPOS") {
        Ok(raw) => parse_home_position(&raw).map(Some),
        Err(_) => Ok(None),
    }
}

pub fn parse_home_position(raw: &str) -> Result<Position, Error> {
    let mut parts = raw.splitn(2, ',');
    let (lat_s, lon_s) = match (parts.next(), parts.next()) {
        (Some(a), Some(b)) => (a.trim(), b.trim()),
        _ => return Err(Error::InvalidHomePosition(raw.to_string())),
    };
    let latitude: f64 = lat_s
        .parse()
        .map_err(|_| Error::InvalidHomePosition(raw.to_string()))?;
    let longitude: f64 = lon_s
        .parse()
        .map_err(|_| Error::InvalidHomePosition(raw.to_string()))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::InvalidHomePosition(raw.to_string()));
    }
    Ok(Position { latitude, longitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_pair() {
        let pos = parse_home_position("43.3,1.35").unwrap();
        assert_eq!(pos.latitude, 43.3);
        assert_eq!(pos.longitude, 1.35);
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        assert!(parse_home_position("91.0,0.0").is_err());
    }

    #[test]
    fn rejects_malformed_string() {
        assert!(parse_home_position("not-a-position").is_err());
    }
}
