//! C5 — globally-unambiguous CPR (Compact Position Reporting) resolution.
//!
//! Ported from the odd/even paired decode in `rs1090`'s CPR resolver and
//! cross-checked against the flat-struct `decode_cpr` in the
//! `ktauchathuranga-adsb` reference port, which implements the identical
//! `j`/`rlat`/`m`/`ni` formulas against a plain `Aircraft` record rather
//! than a `BTreeMap`-keyed scratch state.

const CPR_MAX: f64 = 131_072.0; // 2^17
const AIR_DLAT0: f64 = 360.0 / 60.0;
const AIR_DLAT1: f64 = 360.0 / 59.0;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// Rust's `%` keeps the sign of the dividend; CPR's modulo must always be
/// non-negative.
fn modulo(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r < 0.0 {
        r + b
    } else {
        r
    }
}

/// Number of longitude zones at a given latitude: the standard 59-band
/// table, monotone non-increasing in `|lat|`, equal to 1 above 87 degrees.
#[rustfmt::skip]
pub fn nl(lat: f64) -> u32 {
    let lat = lat.abs();
    if lat < 10.47047130 { 59 }
    else if lat < 14.82817437 { 58 }
    else if lat < 18.18626357 { 57 }
    else if lat < 21.02939493 { 56 }
    else if lat < 23.54504487 { 55 }
    else if lat < 25.82924707 { 54 }
    else if lat < 27.93898710 { 53 }
    else if lat < 29.91135686 { 52 }
    else if lat < 31.77209708 { 51 }
    else if lat < 33.53993436 { 50 }
    else if lat < 35.22899598 { 49 }
    else if lat < 36.85025108 { 48 }
    else if lat < 38.41241892 { 47 }
    else if lat < 39.92256684 { 46 }
    else if lat < 41.38651832 { 45 }
    else if lat < 42.80914012 { 44 }
    else if lat < 44.19454951 { 43 }
    else if lat < 45.54626723 { 42 }
    else if lat < 46.86733252 { 41 }
    else if lat < 48.16039128 { 40 }
    else if lat < 49.42776439 { 39 }
    else if lat < 50.67150166 { 38 }
    else if lat < 51.89342469 { 37 }
    else if lat < 53.09516153 { 36 }
    else if lat < 54.27817472 { 35 }
    else if lat < 55.44378444 { 34 }
    else if lat < 56.59318756 { 33 }
    else if lat < 57.72747354 { 32 }
    else if lat < 58.84763776 { 31 }
    else if lat < 59.95459277 { 30 }
    else if lat < 61.04917774 { 29 }
    else if lat < 62.13216659 { 28 }
    else if lat < 63.20427479 { 27 }
    else if lat < 64.26616523 { 26 }
    else if lat < 65.31845310 { 25 }
    else if lat < 66.36171008 { 24 }
    else if lat < 67.39646774 { 23 }
    else if lat < 68.42322022 { 22 }
    else if lat < 69.44242631 { 21 }
    else if lat < 70.45451075 { 20 }
    else if lat < 71.45986473 { 19 }
    else if lat < 72.45884545 { 18 }
    else if lat < 73.45177442 { 17 }
    else if lat < 74.43893416 { 16 }
    else if lat < 75.42056257 { 15 }
    else if lat < 76.39684391 { 14 }
    else if lat < 77.36789461 { 13 }
    else if lat < 78.33374083 { 12 }
    else if lat < 79.29428225 { 11 }
    else if lat < 80.24923213 { 10 }
    else if lat < 81.19801349 { 9 }
    else if lat < 82.13956981 { 8 }
    else if lat < 83.07199445 { 7 }
    else if lat < 83.99173563 { 6 }
    else if lat < 84.89166191 { 5 }
    else if lat < 85.75541621 { 4 }
    else if lat < 86.53536998 { 3 }
    else if lat < 87.00000000 { 2 }
    else { 1 }
}

/// Resolve a paired even/odd airborne position report. `*_lat`/`*_lon` are
/// the raw 17-bit CPR values; `most_recent_odd` selects which of the two
/// frames is used for the final latitude/longitude (per spec ss4.5, "pick
/// the most recent message"). Returns `None` if the pair straddles an
/// NL zone boundary.
pub fn airborne_position(
    even_lat: u32,
    even_lon: u32,
    odd_lat: u32,
    odd_lon: u32,
    most_recent_odd: bool,
) -> Option<Position> {
    let lat0 = even_lat as f64;
    let lat1 = odd_lat as f64;
    let lon0 = even_lon as f64;
    let lon1 = odd_lon as f64;

    let j = ((59.0 * lat0 - 60.0 * lat1) / CPR_MAX + 0.5).floor();

    let mut rlat0 = AIR_DLAT0 * (modulo(j, 60.0) + lat0 / CPR_MAX);
    let mut rlat1 = AIR_DLAT1 * (modulo(j, 59.0) + lat1 / CPR_MAX);
    if rlat0 >= 270.0 {
        rlat0 -= 360.0;
    }
    if rlat1 >= 270.0 {
        rlat1 -= 360.0;
    }

    if nl(rlat0) != nl(rlat1) {
        return None;
    }

    let (lat, lon_chosen, nl_zones, is_odd) = if most_recent_odd {
        (rlat1, lon1, nl(rlat1), 1.0)
    } else {
        (rlat0, lon0, nl(rlat0), 0.0)
    };

    let m = ((lon0 * (nl_zones as f64 - 1.0) - lon1 * nl_zones as f64) / CPR_MAX + 0.5).floor();
    let ni = (nl_zones as f64 - is_odd).max(1.0);
    let mut lon = (360.0 / ni) * (modulo(m, ni) + lon_chosen / CPR_MAX);
    if lon > 180.0 {
        lon -= 360.0;
    }

    Some(Position {
        latitude: lat,
        longitude: lon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn nl_is_monotone_and_pole_saturates() {
        assert_eq!(nl(0.0), 59);
        assert_eq!(nl(45.0), 42);
        assert_eq!(nl(89.0), 1);
        assert_eq!(nl(87.0), 1);
        let mut prev = 59;
        let mut lat = 0.0;
        while lat < 90.0 {
            let cur = nl(lat);
            assert!(cur <= prev);
            prev = cur;
            lat += 0.25;
        }
    }

    #[test]
    fn resolves_known_pair_near_belgium() {
        // even lat=93000 lon=51372 @ t=0, odd lat=74158 lon=50194 @ t=10s,
        // odd is the most recent sample.
        let pos = airborne_position(93000, 51372, 74158, 50194, true)
            .expect("pair should resolve, same zone");
        assert_relative_eq!(pos.latitude, 52.2572, epsilon = 0.001);
        assert_relative_eq!(pos.longitude, 3.9193, epsilon = 0.001);
    }

    #[test]
    fn identical_raw_pair_never_panics_and_picks_a_zone() {
        // Degenerate but well-defined input: same raw lat/lon reported as
        // both the even and odd frame. Must resolve without panicking,
        // and the implied even/odd NL zones must agree (they're the
        // same point), so this must always return Some.
        let pos = airborne_position(60000, 60000, 60000, 60000, false);
        assert!(pos.is_some());
    }
}
