//! C4 — the frame decoder: raw bytes to a flat, mutable `ModeSMessage`.
//!
//! Grounded on the `ktauchathuranga-adsb` `decoder.rs` reference port
//! (`ModesMessage`, `decode_modes_message`, `decode_extended_squitter`) and
//! on `rs1090`'s `decode_id13`/`gray2alt`/AC13 Q-bit algorithms, here
//! ported from deku's declarative per-field reads to manual bit extraction
//! against the flat struct the spec requires.

use crate::crc;

/// Altitude reporting unit. M=1 (meters) is a documented reserved branch —
/// `spec.md` leaves it stubbed in the source this was distilled from, so
/// altitude stays 0 for that case rather than guessing a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AltitudeUnit {
    Feet,
    Meters,
}

const AIS_CHARSET: &[u8; 64] =
    b"?ABCDEFGHIJKLMNOPQRSTUVWXYZ????? ???????????????0123456789??????";

/// A decoded Mode S / ADS-B frame. Kept as a flat, mutable struct (rather
/// than a typed enum per downlink format) because the aircraft tracker and
/// the SBS/raw encoders need to read arbitrary combinations of its fields
/// regardless of which `df`/`me_type` populated them — the layout `spec.md`
/// ss3 specifies directly.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModeSMessage {
    pub msg: [u8; 14],
    pub bits: usize,
    pub df: u8,
    pub crc_ok: bool,
    pub error_bit: Option<usize>,
    pub error_bit2: Option<usize>,

    pub aa: [u8; 3],
    pub ca: u8,
    pub flight_status: u8,
    pub dr: u8,
    pub um: u8,
    pub identity: u16,

    pub me_type: u8,
    pub me_subtype: u8,

    pub altitude: i32,
    pub unit: AltitudeUnit,

    pub raw_lat: u32,
    pub raw_lon: u32,
    pub odd_flag: bool,
    pub utc_flag: bool,

    pub ew_dir: i32,
    pub ew_velocity: u32,
    pub ns_dir: i32,
    pub ns_velocity: u32,
    pub vert_rate_source: u8,
    pub vert_rate_sign: i32,
    pub vert_rate: i32,
    pub heading: f64,
    pub heading_valid: bool,
    pub velocity: u32,

    pub aircraft_type: u8,
    pub flight: String,

    pub sig_level: f64,
    pub phase_corrected: bool,
}

impl Default for ModeSMessage {
    fn default() -> Self {
        ModeSMessage {
            msg: [0; 14],
            bits: 0,
            df: 0,
            crc_ok: false,
            error_bit: None,
            error_bit2: None,
            aa: [0; 3],
            ca: 0,
            flight_status: 0,
            dr: 0,
            um: 0,
            identity: 0,
            me_type: 0,
            me_subtype: 0,
            altitude: 0,
            unit: AltitudeUnit::Feet,
            raw_lat: 0,
            raw_lon: 0,
            odd_flag: false,
            utc_flag: false,
            ew_dir: 0,
            ew_velocity: 0,
            ns_dir: 0,
            ns_velocity: 0,
            vert_rate_source: 0,
            vert_rate_sign: 0,
            vert_rate: 0,
            heading: 0.0,
            heading_valid: false,
            velocity: 0,
            aircraft_type: 0,
            flight: String::new(),
            sig_level: 0.0,
            phase_corrected: false,
        }
    }
}

impl ModeSMessage {
    pub fn icao_address(&self) -> u32 {
        ((self.aa[0] as u32) << 16) | ((self.aa[1] as u32) << 8) | self.aa[2] as u32
    }

    /// `*HEX;\n` wire form, per spec ss6 raw output.
    pub fn to_raw_string(&self) -> String {
        format!("*{};\n", hex::encode_upper(&self.msg[..self.bits / 8]))
    }
}

/// Message length in bits for a given downlink format (DF field).
pub fn message_len_by_type(df: u8) -> usize {
    match df {
        0 | 4 | 5 | 11 => 56,
        _ => 112,
    }
}

/// Decode 13-bit Gillham-interleaved identity (squawk or AC13 N value).
/// Bit layout matches the standard C1 A1 C2 A2 C4 A4 ?? B1 D1 B2 D2 B4 D4
/// interleave.
fn decode_id13(id13: u16) -> u16 {
    let mut hex_gillham = 0u16;
    if id13 & 0x1000 != 0 {
        hex_gillham |= 0x0010;
    } // C1
    if id13 & 0x0800 != 0 {
        hex_gillham |= 0x1000;
    } // A1
    if id13 & 0x0400 != 0 {
        hex_gillham |= 0x0020;
    } // C2
    if id13 & 0x0200 != 0 {
        hex_gillham |= 0x2000;
    } // A2
    if id13 & 0x0100 != 0 {
        hex_gillham |= 0x0040;
    } // C4
    if id13 & 0x0080 != 0 {
        hex_gillham |= 0x4000;
    } // A4
    if id13 & 0x0020 != 0 {
        hex_gillham |= 0x0100;
    } // B1
    if id13 & 0x0010 != 0 {
        hex_gillham |= 0x0001;
    } // D1
    if id13 & 0x0008 != 0 {
        hex_gillham |= 0x0200;
    } // B2
    if id13 & 0x0004 != 0 {
        hex_gillham |= 0x0002;
    } // D2
    if id13 & 0x0002 != 0 {
        hex_gillham |= 0x0400;
    } // B4
    if id13 & 0x0001 != 0 {
        hex_gillham |= 0x0004;
    } // D4
    hex_gillham
}

/// Gillham (Mode A) to Mode C conversion: folds the interleaved 500ft and
/// 100ft Gray-code pentads back into a signed hundreds-of-feet count. The
/// classic cross-checking/XOR-fold structure used by every Mode-S decoder
/// lineage (dump1090 included); returns `None` for bit patterns that are
/// not legal Gillham altitude codes.
fn gray2alt(gillham: u16) -> Option<i32> {
    if gillham & 0xFFFF8889 != 0 || gillham & 0x000000F0 == 0 {
        return None;
    }

    let mut one_hundreds = 0u32;
    let gillham = gillham as u32;
    if gillham & 0x0010 != 0 {
        one_hundreds ^= 0x0007;
    }
    if gillham & 0x0020 != 0 {
        one_hundreds ^= 0x0003;
    }
    if gillham & 0x0040 != 0 {
        one_hundreds ^= 0x0001;
    }

    let mut gillham = gillham;
    if one_hundreds & 5 != 0 {
        gillham ^= 0x0006;
    }

    let mut five_hundreds = 0u32;
    if gillham & 0x0002 != 0 {
        five_hundreds ^= 0x0FFF;
    }
    if gillham & 0x0004 != 0 {
        five_hundreds ^= 0x07FF;
    }
    if gillham & 0x1000 != 0 {
        five_hundreds ^= 0x03FF;
    }
    if gillham & 0x2000 != 0 {
        five_hundreds ^= 0x01FF;
    }
    if gillham & 0x0100 != 0 {
        five_hundreds ^= 0x00FF;
    }
    if gillham & 0x0200 != 0 {
        five_hundreds ^= 0x007F;
    }
    if gillham & 0x0400 != 0 {
        five_hundreds ^= 0x003F;
    }
    if gillham & 0x0800 != 0 {
        five_hundreds ^= 0x001F;
    }
    if gillham & 0x0008 != 0 {
        five_hundreds ^= 0x000F;
    }

    if five_hundreds & 1 != 0 {
        one_hundreds = 6 - one_hundreds;
    }

    Some((five_hundreds as i32) * 5 + one_hundreds as i32 - 13)
}

/// AC13 field (DF 0/4/16/20). Q bit at msg bit 47 (`msg[3] & 0x10`), M bit
/// at `msg[3] & 0x40`. Q=1: `25*N - 1000` ft with the 11 surrounding bits
/// read as plain binary. Q=0, M=0: Gillham/Gray coding. M=1: reserved.
fn decode_ac13(msg: &[u8]) -> (i32, AltitudeUnit) {
    let m_bit = msg[3] & 0x40 != 0;
    let q_bit = msg[3] & 0x10 != 0;
    if m_bit {
        return (0, AltitudeUnit::Meters);
    }
    if q_bit {
        let n = (((msg[2] as u32) << 4) & 0x0FE0)
            | (((msg[3] as u32) >> 4) & 0x000E)
            | ((msg[3] as u32) & 0x0001);
        let alt = 25 * n as i32 - 1000;
        (alt.max(0), AltitudeUnit::Feet)
    } else {
        // Gillham: 13 bits spanning msg[2..4], minus the M/Q bits.
        let id13 = (((msg[2] as u16) << 8) | msg[3] as u16) & 0x1FFF;
        let gillham = decode_id13(id13);
        match gray2alt(gillham) {
            Some(n) if n >= -12 => (100 * n, AltitudeUnit::Feet),
            _ => (0, AltitudeUnit::Feet),
        }
    }
}

/// AC12 field (DF17 ME 9..18). Q bit at `msg[5] & 0x01`. The Q=0 (Gillham)
/// branch reuses the 13-bit decode machinery with the two bit positions
/// the 12-bit field doesn't carry (the spare bit and D1) forced to zero.
fn decode_ac12(msg: &[u8]) -> (i32, AltitudeUnit) {
    let q_bit = msg[5] & 0x01 != 0;
    if q_bit {
        let n = ((msg[5] as u32 >> 1) << 4) | (msg[6] as u32 >> 4);
        ((25 * n as i32 - 1000).max(0), AltitudeUnit::Feet)
    } else {
        let id11 = (((msg[5] as u16) << 3) | (msg[6] as u16 >> 5)) & 0x07FF;
        // Re-insert the missing spare bit (0x0040) and D1 (0x0010) as 0,
        // matching the 13-bit field's bit positions.
        let id13 = ((id11 & 0x003F) | ((id11 & 0x07C0) << 1)) & 0x1FFF;
        let gillham = decode_id13(id13);
        match gray2alt(gillham) {
            Some(n) if n >= -12 => (100 * n, AltitudeUnit::Feet),
            _ => (0, AltitudeUnit::Feet),
        }
    }
}

fn decode_squawk(msg: &[u8]) -> u16 {
    let id13 = (((msg[2] as u16) << 8) | msg[3] as u16) & 0x1FFF;
    let gillham = decode_id13(id13);
    let a = ((gillham >> 12) & 0xF) as u16;
    let b = ((gillham >> 8) & 0xF) as u16;
    let c = ((gillham >> 4) & 0xF) as u16;
    let d = (gillham & 0xF) as u16;
    a * 1000 + b * 100 + c * 10 + d
}

fn decode_callsign(me: &[u8]) -> String {
    // 8 chars, 6 bits each, starting right after the 8-bit ME type.
    let mut chars = [0u8; 8];
    let bits: u64 = (me[1] as u64) << 40
        | (me[2] as u64) << 32
        | (me[3] as u64) << 24
        | (me[4] as u64) << 16
        | (me[5] as u64) << 8
        | me[6] as u64;
    for (i, c) in chars.iter_mut().enumerate() {
        let shift = 42 - i * 6;
        let sym = ((bits >> shift) & 0x3F) as usize;
        *c = AIS_CHARSET[sym];
    }
    String::from_utf8_lossy(&chars).trim_end().to_string()
}

/// Parse the `*HEXDIGITS;` raw wire format (spec ss6), including the
/// `*0000;` heartbeat which carries zero payload bytes.
pub fn parse_raw_line(line: &str) -> Option<Vec<u8>> {
    let line = line.trim();
    let body = line.strip_prefix('*')?.strip_suffix(';')?;
    if body.eq_ignore_ascii_case("0000") {
        return Some(Vec::new());
    }
    hex::decode(body).ok()
}

/// Decode a raw frame buffer into a `ModeSMessage`, applying CRC
/// verification, AP recovery and (optionally) single/two-bit error
/// correction. `icao_known` is consulted for AP recovery on the DF set
/// that XORs the address into the checksum (spec ss4.3); it should be
/// backed by the ICAO cache (C6).
pub fn decode_message(
    raw: &[u8],
    fix_errors: bool,
    aggressive: bool,
    icao_known: impl Fn(u32) -> bool,
) -> ModeSMessage {
    let mut mm = ModeSMessage::default();
    let df = raw[0] >> 3;
    mm.df = df;
    mm.bits = message_len_by_type(df);
    let nbytes = mm.bits / 8;
    mm.msg[..nbytes.min(raw.len())].copy_from_slice(&raw[..nbytes.min(raw.len())]);
    if raw.len() < nbytes {
        return mm;
    }

    let data = &mm.msg[..nbytes];
    let residual = crc::checksum(data);

    match df {
        11 | 17 | 18 => {
            mm.crc_ok = residual == 0;
            if !mm.crc_ok && fix_errors {
                if let Some(bit) = crc::fix_single_bit(data, mm.bits) {
                    mm.msg[bit / 8] ^= 1 << (7 - (bit % 8));
                    mm.error_bit = Some(bit);
                    mm.crc_ok = true;
                } else if aggressive && df == 17 {
                    if let Some((b1, b2)) = crc::fix_two_bits(data) {
                        mm.msg[b1 / 8] ^= 1 << (7 - (b1 % 8));
                        mm.msg[b2 / 8] ^= 1 << (7 - (b2 % 8));
                        mm.error_bit = Some(b1);
                        mm.error_bit2 = Some(b2);
                        mm.crc_ok = true;
                    }
                }
            }
            mm.aa = [mm.msg[1], mm.msg[2], mm.msg[3]];
        }
        0 | 4 | 5 | 16 | 20 | 21 | 24 => {
            let candidate = crc::recover_address(data);
            let addr = ((candidate[0] as u32) << 16)
                | ((candidate[1] as u32) << 8)
                | candidate[2] as u32;
            mm.crc_ok = icao_known(addr);
            if mm.crc_ok {
                mm.aa = candidate;
            }
        }
        _ => {
            mm.crc_ok = false;
        }
    }

    if !mm.crc_ok {
        return mm;
    }

    mm.ca = mm.msg[0] & 0x07;

    match df {
        0 => {
            let (alt, unit) = decode_ac13(&mm.msg);
            mm.altitude = alt;
            mm.unit = unit;
        }
        4 | 20 => {
            mm.flight_status = mm.msg[0] & 0x07;
            let (alt, unit) = decode_ac13(&mm.msg);
            mm.altitude = alt;
            mm.unit = unit;
        }
        5 | 21 => {
            mm.flight_status = mm.msg[0] & 0x07;
            mm.identity = decode_squawk(&mm.msg);
        }
        16 => {
            let (alt, unit) = decode_ac13(&mm.msg);
            mm.altitude = alt;
            mm.unit = unit;
        }
        17 | 18 => {
            decode_extended_squitter(&mut mm);
        }
        _ => {}
    }

    mm
}

fn decode_extended_squitter(mm: &mut ModeSMessage) {
    let me = &mm.msg[4..11];
    mm.me_type = me[0] >> 3;
    mm.me_subtype = me[0] & 0x07;

    match mm.me_type {
        1..=4 => {
            mm.aircraft_type = mm.me_subtype;
            mm.flight = decode_callsign(me);
        }
        9..=18 => {
            let (alt, unit) = decode_ac12(me);
            mm.altitude = alt;
            mm.unit = unit;
            mm.odd_flag = me[2] & 0x04 != 0;
            mm.utc_flag = me[2] & 0x08 != 0;
            mm.raw_lat = (((me[2] as u32) & 0x03) << 15)
                | ((me[3] as u32) << 7)
                | ((me[4] as u32) >> 1);
            mm.raw_lon =
                (((me[4] as u32) & 0x01) << 16) | ((me[5] as u32) << 8) | me[6] as u32;
        }
        19 => {
            mm.me_subtype = me[0] & 0x07;
            if mm.me_subtype == 1 || mm.me_subtype == 2 {
                mm.ew_dir = if me[1] & 0x04 != 0 { -1 } else { 1 };
                mm.ew_velocity = (((me[1] as u32) & 0x03) << 8) | me[2] as u32;
                mm.ew_velocity = mm.ew_velocity.saturating_sub(1);
                mm.ns_dir = if me[3] & 0x80 != 0 { -1 } else { 1 };
                mm.ns_velocity = (((me[3] as u32) & 0x7F) << 3) | ((me[4] as u32) >> 5);
                mm.ns_velocity = mm.ns_velocity.saturating_sub(1);
                mm.vert_rate_source = (me[4] >> 4) & 0x01;
                mm.vert_rate_sign = if me[4] & 0x08 != 0 { -1 } else { 1 };
                let raw_vr = (((me[4] as i32) & 0x07) << 6) | ((me[5] as i32) >> 2);
                mm.vert_rate = mm.vert_rate_sign * (raw_vr.saturating_sub(1)) * 64;

                let ew = mm.ew_dir as f64 * mm.ew_velocity as f64;
                let ns = mm.ns_dir as f64 * mm.ns_velocity as f64;
                mm.velocity = ew.hypot(ns).round() as u32;
                let mut heading = ew.atan2(ns).to_degrees();
                if heading < 0.0 {
                    heading += 360.0;
                }
                mm.heading = heading;
                mm.heading_valid = true;
            } else if mm.me_subtype == 3 || mm.me_subtype == 4 {
                mm.heading_valid = me[1] & 0x04 != 0;
                mm.heading = (((me[1] as u32 & 0x03) << 8) | me[2] as u32) as f64 * 360.0 / 1024.0;
            }
        }
        23 | 28 | 29 | 31 => {
            // partially decoded per spec ss4.4/ss9: field layouts beyond
            // the DF/ME dispatch itself are recorded only in the
            // (type, subtype) observability histogram kept by the
            // message router, not here.
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always_known(_addr: u32) -> bool {
        true
    }

    #[test]
    fn df17_velocity_frame_decodes() {
        let raw = hex::decode("8D4B969699155600E87406F5B69F").unwrap();
        let mm = decode_message(&raw, false, false, always_known);
        assert_eq!(mm.df, 17);
        assert_eq!(mm.icao_address(), 0x4B9696);
        assert!(mm.crc_ok);
        assert_eq!(mm.me_type, 19);
        assert_eq!(mm.me_subtype, 1);
        assert!(mm.velocity > 0);
    }

    #[test]
    fn heartbeat_line_has_empty_payload() {
        assert_eq!(parse_raw_line("*0000;\n"), Some(Vec::new()));
    }

    #[test]
    fn raw_round_trip_hex_case() {
        let raw = parse_raw_line("*8D4840D6202CC371C32CE0576098;\n").unwrap();
        let mm = decode_message(&raw, false, false, always_known);
        assert!(mm.crc_ok);
        assert_eq!(mm.to_raw_string(), "*8D4840D6202CC371C32CE0576098;\n");
    }

    #[test]
    fn message_len_by_df() {
        assert_eq!(message_len_by_type(0), 56);
        assert_eq!(message_len_by_type(5), 56);
        assert_eq!(message_len_by_type(17), 112);
        assert_eq!(message_len_by_type(20), 112);
    }
}
