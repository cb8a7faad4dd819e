//! C7 — the live aircraft fleet: one record per ICAO address, TTL
//! eviction, and the `show` render-state machine.
//!
//! Grounded on `ktauchathuranga-adsb__src-aircraft.rs.rs`'s
//! `Aircraft`/`AircraftStore` (`update_from_message`, `remove_stale`,
//! running signal-level average, CPR scratch fields), generalized with the
//! spec's `show` state machine and dead-reckoning estimator fields that
//! reference does not implement. Keyed by address in a `HashMap` rather
//! than an intrusive linked list, per `spec.md` ss9's redesign note.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::cpr::{self, Position};
use crate::message::{AltitudeUnit, ModeSMessage};

/// A position sentinel matching `spec.md` ss3: `±1000` marks "no valid fix
/// yet" so that zero (a legitimate equator/meridian reading) is never
/// confused with "unknown".
const INVALID_POSITION: f64 = 1000.0;

const CPR_PAIR_MAX_AGE: Duration = Duration::from_secs(10 * 60);
const EARTH_RADIUS_NM: f64 = 3440.065;
const EARTH_RADIUS_M: f64 = 6_371_000.0;
const KNOTS_TO_MPS: f64 = 1.852 * 1000.0 / 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ShowState {
    FirstTime,
    Normal,
    LastTime,
    None,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Aircraft {
    pub addr: u32,
    pub flight: String,
    pub altitude: i32,
    pub altitude_unit: AltitudeUnit,
    pub speed: u32,
    pub heading: f64,
    pub heading_valid: bool,
    pub identity: u16,

    #[serde(skip, default = "Instant::now")]
    pub seen_first: Instant,
    #[serde(skip, default = "Instant::now")]
    pub seen_last: Instant,
    pub messages: u64,

    pub sig_levels: [f64; 4],
    pub sig_idx: usize,

    odd_lat: u32,
    odd_lon: u32,
    #[serde(skip, default = "Instant::now")]
    odd_time: Instant,
    even_lat: u32,
    even_lon: u32,
    #[serde(skip, default = "Instant::now")]
    even_time: Instant,
    has_odd: bool,
    has_even: bool,

    pub position: Position,
    #[serde(skip)]
    position_time: Option<Instant>,
    pub distance_nm: Option<f64>,

    pub est_position: Option<Position>,
    #[serde(skip)]
    pub est_seen_last: Option<Instant>,
    pub est_distance_nm: Option<f64>,

    pub show: ShowState,
}

impl Aircraft {
    fn new(addr: u32, now: Instant) -> Self {
        Aircraft {
            addr,
            flight: String::new(),
            altitude: 0,
            altitude_unit: AltitudeUnit::Feet,
            speed: 0,
            heading: 0.0,
            heading_valid: false,
            identity: 0,
            seen_first: now,
            seen_last: now,
            messages: 0,
            sig_levels: [0.0; 4],
            sig_idx: 0,
            odd_lat: 0,
            odd_lon: 0,
            odd_time: now,
            even_lat: 0,
            even_lon: 0,
            even_time: now,
            has_odd: false,
            has_even: false,
            position: Position {
                latitude: INVALID_POSITION,
                longitude: INVALID_POSITION,
            },
            position_time: None,
            distance_nm: None,
            est_position: None,
            est_seen_last: None,
            est_distance_nm: None,
            show: ShowState::FirstTime,
        }
    }

    pub fn has_position(&self) -> bool {
        self.position.latitude != INVALID_POSITION && self.position.longitude != INVALID_POSITION
    }
}

pub struct AircraftTracker {
    fleet: HashMap<u32, Aircraft>,
    ttl: Duration,
    home: Option<Position>,
}

impl AircraftTracker {
    pub fn new(ttl: Duration, home: Option<Position>) -> Self {
        AircraftTracker {
            fleet: HashMap::new(),
            ttl,
            home,
        }
    }

    pub fn len(&self) -> usize {
        self.fleet.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fleet.is_empty()
    }

    pub fn get(&self, addr: u32) -> Option<&Aircraft> {
        self.fleet.get(&addr)
    }

    pub fn all(&self) -> impl Iterator<Item = &Aircraft> {
        self.fleet.values()
    }

    fn find_or_create(&mut self, addr: u32, now: Instant) -> &mut Aircraft {
        self.fleet.entry(addr).or_insert_with(|| Aircraft::new(addr, now))
    }

    /// Apply a decoded, CRC-good frame to the tracker. Mirrors
    /// `spec.md` ss4.7: updates identity/altitude/velocity fields per
    /// DF/ME, pushes the signal-level ring, and on any airborne-position
    /// message stores CPR scratch and resolves position if the pair is
    /// complete and fresh.
    pub fn receive(&mut self, mm: &ModeSMessage, now: Instant) {
        let addr = mm.icao_address();
        let ac = self.find_or_create(addr, now);
        ac.seen_last = now;
        ac.messages += 1;

        if mm.sig_level > 0.0 {
            ac.sig_levels[ac.sig_idx % 4] = mm.sig_level;
            ac.sig_idx = ac.sig_idx.wrapping_add(1);
        }

        match mm.df {
            0 | 4 | 16 | 20 => {
                ac.altitude = mm.altitude;
                ac.altitude_unit = mm.unit;
            }
            5 | 21 => {
                if mm.identity != 0 {
                    ac.identity = mm.identity;
                }
            }
            17 | 18 => match mm.me_type {
                1..=4 => ac.flight = mm.flight.clone(),
                9..=18 => {
                    ac.altitude = mm.altitude;
                    ac.altitude_unit = mm.unit;
                    if mm.odd_flag {
                        ac.odd_lat = mm.raw_lat;
                        ac.odd_lon = mm.raw_lon;
                        ac.odd_time = now;
                        ac.has_odd = true;
                    } else {
                        ac.even_lat = mm.raw_lat;
                        ac.even_lon = mm.raw_lon;
                        ac.even_time = now;
                        ac.has_even = true;
                    }
                    self.try_resolve_position(addr);
                }
                19 => {
                    if mm.me_subtype == 1 || mm.me_subtype == 2 {
                        ac.speed = mm.velocity;
                        ac.heading = mm.heading;
                        ac.heading_valid = mm.heading_valid;
                    } else if mm.me_subtype == 3 || mm.me_subtype == 4 {
                        ac.heading = mm.heading;
                        ac.heading_valid = mm.heading_valid;
                    }
                }
                _ => {}
            },
            _ => {}
        }

        self.refresh_distance(addr);
    }

    fn try_resolve_position(&mut self, addr: u32) {
        let home = self.home;
        let Some(ac) = self.fleet.get_mut(&addr) else {
            return;
        };
        if !(ac.has_odd && ac.has_even) {
            return;
        }
        let age = if ac.odd_time > ac.even_time {
            ac.odd_time.duration_since(ac.even_time)
        } else {
            ac.even_time.duration_since(ac.odd_time)
        };
        if age > CPR_PAIR_MAX_AGE {
            return;
        }
        let most_recent_odd = ac.odd_time >= ac.even_time;
        if let Some(pos) = cpr::airborne_position(
            ac.even_lat,
            ac.even_lon,
            ac.odd_lat,
            ac.odd_lon,
            most_recent_odd,
        ) {
            let now = if most_recent_odd { ac.odd_time } else { ac.even_time };
            ac.position = pos;
            ac.position_time = Some(now);
            if let Some(home) = home {
                ac.distance_nm = Some(great_circle_nm(home, ac.position));
            }
        }
    }

    fn refresh_distance(&mut self, addr: u32) {
        let Some(home) = self.home else { return };
        if let Some(ac) = self.fleet.get_mut(&addr) {
            if ac.has_position() {
                ac.distance_nm = Some(great_circle_nm(home, ac.position));
            }
        }
    }

    /// Dead-reckoning estimator (`spec.md` ss4.5): from the last confirmed
    /// position and the current speed/heading, integrate
    /// `Δx = d·sinθ, Δy = d·cosθ` over the elapsed time since that fix
    /// (`d = speed·1.852 km/h·Δt`), converting the planar offset back to
    /// spherical via a flat-Earth (equirectangular) approximation.
    fn update_estimates(&mut self, now: Instant) {
        let home = self.home;
        for ac in self.fleet.values_mut() {
            let (Some(fix_time), true) = (ac.position_time, ac.has_position()) else {
                continue;
            };
            if !ac.heading_valid || ac.speed == 0 {
                continue;
            }
            let elapsed = now.saturating_duration_since(fix_time).as_secs_f64();
            let est = dead_reckon(ac.position, ac.speed, ac.heading, elapsed);
            ac.est_position = Some(est);
            ac.est_seen_last = Some(now);
            if let Some(home) = home {
                ac.est_distance_nm = Some(great_circle_nm(home, est));
            }
        }
    }

    /// Drives the `show` state machine (`spec.md` ss4.7), the dead-reckoning
    /// estimator and TTL eviction. Called from the background tick (C11),
    /// decoupled from `receive` so a "leaving" aircraft gets one extra
    /// render frame before removal.
    pub fn tick(&mut self, now: Instant) {
        self.update_estimates(now);
        let ttl = self.ttl;
        self.fleet.retain(|_, ac| {
            ac.show = match ac.show {
                ShowState::FirstTime => ShowState::Normal,
                ShowState::Normal if now.duration_since(ac.seen_last) > ttl => ShowState::LastTime,
                ShowState::Normal => ShowState::Normal,
                ShowState::LastTime => ShowState::None,
                ShowState::None => ShowState::None,
            };
            ac.show != ShowState::None
        });
    }
}

/// Integrate `Δx = d·sinθ, Δy = d·cosθ` (`θ` = heading, clockwise from
/// north) from `from` over `elapsed_secs` at `speed_knots`, converting the
/// planar meter offset back to a lat/lon delta via the small-angle
/// equirectangular approximation (`spec.md` ss4.5's "ECEF approximation").
fn dead_reckon(from: Position, speed_knots: u32, heading_deg: f64, elapsed_secs: f64) -> Position {
    let d = speed_knots as f64 * KNOTS_TO_MPS * elapsed_secs;
    let theta = heading_deg.to_radians();
    let dx = d * theta.sin();
    let dy = d * theta.cos();

    let dlat = (dy / EARTH_RADIUS_M).to_degrees();
    let lat_rad = from.latitude.to_radians();
    let dlon = (dx / (EARTH_RADIUS_M * lat_rad.cos())).to_degrees();

    Position {
        latitude: from.latitude + dlat,
        longitude: from.longitude + dlon,
    }
}

fn great_circle_nm(home: Position, pos: Position) -> f64 {
    let (lat1, lon1) = (home.latitude.to_radians(), home.longitude.to_radians());
    let (lat2, lon2) = (pos.latitude.to_radians(), pos.longitude.to_radians());
    let cos_angle =
        lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon1 - lon2).cos();
    EARTH_RADIUS_NM * cos_angle.clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_message(df: u8) -> ModeSMessage {
        ModeSMessage {
            df,
            crc_ok: true,
            aa: [0x4B, 0x96, 0x96],
            ..Default::default()
        }
    }

    #[test]
    fn fleet_never_has_duplicate_addresses() {
        let mut tracker = AircraftTracker::new(Duration::from_secs(60), None);
        let now = Instant::now();
        tracker.receive(&base_message(0), now);
        tracker.receive(&base_message(0), now);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn new_aircraft_starts_first_time_then_normal_then_evicted() {
        let mut tracker = AircraftTracker::new(Duration::from_millis(10), None);
        let t0 = Instant::now();
        tracker.receive(&base_message(0), t0);
        assert_eq!(tracker.get(0x4B9696).unwrap().show, ShowState::FirstTime);

        tracker.tick(t0);
        assert_eq!(tracker.get(0x4B9696).unwrap().show, ShowState::Normal);

        let later = t0 + Duration::from_millis(50);
        tracker.tick(later);
        assert_eq!(tracker.get(0x4B9696).unwrap().show, ShowState::LastTime);

        tracker.tick(later);
        assert!(tracker.get(0x4B9696).is_none());
    }

    #[test]
    fn cpr_pair_resolves_position() {
        let mut tracker = AircraftTracker::new(Duration::from_secs(60), None);
        let t0 = Instant::now();
        let mut even = base_message(17);
        even.me_type = 11;
        even.odd_flag = false;
        even.raw_lat = 93000;
        even.raw_lon = 51372;
        tracker.receive(&even, t0);

        let mut odd = base_message(17);
        odd.me_type = 11;
        odd.odd_flag = true;
        odd.raw_lat = 74158;
        odd.raw_lon = 50194;
        tracker.receive(&odd, t0 + Duration::from_secs(10));

        let ac = tracker.get(0x4B9696).unwrap();
        assert!(ac.has_position());
        assert!((ac.position.latitude - 52.2572).abs() < 0.001);
        assert!((ac.position.longitude - 3.9193).abs() < 0.001);
    }

    #[test]
    fn dead_reckoning_estimates_position_after_confirmed_fix() {
        let home = Position {
            latitude: 52.0,
            longitude: 3.9,
        };
        let mut tracker = AircraftTracker::new(Duration::from_secs(600), Some(home));
        let t0 = Instant::now();
        let mut even = base_message(17);
        even.me_type = 11;
        even.odd_flag = false;
        even.raw_lat = 93000;
        even.raw_lon = 51372;
        tracker.receive(&even, t0);

        let fix_time = t0 + Duration::from_secs(10);
        let mut odd = base_message(17);
        odd.me_type = 11;
        odd.odd_flag = true;
        odd.raw_lat = 74158;
        odd.raw_lon = 50194;
        tracker.receive(&odd, fix_time);

        let mut velocity = base_message(17);
        velocity.me_type = 19;
        velocity.me_subtype = 1;
        velocity.velocity = 200; // knots, due north
        velocity.heading = 0.0;
        velocity.heading_valid = true;
        tracker.receive(&velocity, fix_time);

        let confirmed = tracker.get(0x4B9696).unwrap().position;
        assert!(tracker.get(0x4B9696).unwrap().est_position.is_none());

        tracker.tick(fix_time + Duration::from_secs(3600));
        let ac = tracker.get(0x4B9696).unwrap();
        let est = ac.est_position.expect("estimate should be populated by tick");
        assert!(est.latitude > confirmed.latitude, "due-north heading should move latitude up");
        assert!((est.longitude - confirmed.longitude).abs() < 1e-9);
        assert!(ac.est_distance_nm.is_some());
        assert!(ac.est_seen_last.is_some());
    }
}
