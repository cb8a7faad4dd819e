//! BaseStation ("SBS") CSV encoding, spec ss6's `sbs-out` wire format.
//!
//! Grounded on the MSG-type table in `spec.md` ss6 (DF/ME -> MSG kind) and
//! on the field-ordering convention shown by `rs1090`'s JSON aircraft
//! records, adapted here to the 22-field comma-separated BaseStation line
//! rather than JSON. No teacher/example file emits this exact format, so
//! the 22-field layout follows the `spec.md` table directly.

use crate::aircraft::Aircraft;
use crate::message::ModeSMessage;

/// One encoded `MSG,...` line, `\r\n`-terminated per spec ss6.
fn msg_line(kind: u8, mm: &ModeSMessage, ac: Option<&Aircraft>) -> String {
    let icao = format!("{:06X}", mm.icao_address());
    let now = chrono::Utc::now();
    let date = now.format("%Y/%m/%d");
    let time = now.format("%H:%M:%S%.3f");

    let mut fields: Vec<String> = vec![
        "MSG".into(),
        kind.to_string(),
        "111".into(),
        "11111".into(),
        icao,
        "111111".into(),
        date.to_string(),
        time.to_string(),
        date.to_string(),
        time.to_string(),
    ];

    let flight = ac.map(|a| a.flight.clone()).unwrap_or_default();
    let altitude = if mm.altitude != 0 { mm.altitude } else { ac.map(|a| a.altitude).unwrap_or(0) };
    let speed = ac.map(|a| a.speed).unwrap_or(mm.velocity);
    let heading = ac.map(|a| a.heading).unwrap_or(mm.heading);
    let (lat, lon) = ac
        .filter(|a| a.has_position())
        .map(|a| (a.position.latitude, a.position.longitude))
        .unwrap_or((0.0, 0.0));
    let vrate = mm.vert_rate;
    let squawk = if mm.identity != 0 { mm.identity } else { ac.map(|a| a.identity).unwrap_or(0) };

    // remaining 12 BaseStation fields: callsign, altitude, ground speed,
    // track, lat, lon, vertical rate, squawk, squawk alert, emergency,
    // spi, is-on-ground.
    fields.push(flight);
    fields.push(if altitude != 0 { altitude.to_string() } else { String::new() });
    fields.push(if speed != 0 { speed.to_string() } else { String::new() });
    fields.push(if heading != 0.0 { format!("{heading:.1}") } else { String::new() });
    fields.push(if lat != 0.0 { format!("{lat:.5}") } else { String::new() });
    fields.push(if lon != 0.0 { format!("{lon:.5}") } else { String::new() });
    fields.push(if vrate != 0 { vrate.to_string() } else { String::new() });
    fields.push(if squawk != 0 { squawk.to_string() } else { String::new() });
    fields.push("0".into()); // squawk alert
    fields.push("0".into()); // emergency
    fields.push("0".into()); // SPI
    fields.push("0".into()); // is on ground

    format!("{}\r\n", fields.join(","))
}

/// Encode a decoded frame to zero or one BaseStation lines, per the spec
/// ss6 DF/ME -> MSG-type table. Returns `None` for DF/ME combinations the
/// BaseStation format doesn't represent (e.g. unassigned ME types).
pub fn encode(mm: &ModeSMessage, ac: Option<&Aircraft>) -> Option<String> {
    if !mm.crc_ok {
        return None;
    }
    let kind = match mm.df {
        0 => 5,
        4 => 5,
        5 => 6,
        11 => 8,
        17 | 18 => match mm.me_type {
            1..=4 => 1,
            9..=18 => 3,
            19 => 4,
            _ => return None,
        },
        21 => 6,
        _ => return None,
    };
    Some(msg_line(kind, mm, ac))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_message() -> ModeSMessage {
        ModeSMessage {
            df: 17,
            crc_ok: true,
            aa: [0x4B, 0x96, 0x96],
            me_type: 11,
            altitude: 38000,
            ..Default::default()
        }
    }

    #[test]
    fn airborne_position_message_encodes_msg3() {
        let mm = position_message();
        let line = encode(&mm, None).expect("should encode");
        assert!(line.starts_with("MSG,3,"));
        assert!(line.contains("4B9696"));
        assert!(line.ends_with("\r\n"));
    }

    #[test]
    fn identification_message_encodes_msg1_with_flight() {
        let mut mm = ModeSMessage {
            df: 17,
            crc_ok: true,
            aa: [0x4B, 0x96, 0x96],
            me_type: 4,
            flight: "KLM1011 ".into(),
            ..Default::default()
        };
        mm.flight = "KLM1011".into();
        let line = encode(&mm, None).unwrap();
        assert!(line.starts_with("MSG,1,"));
        assert!(line.contains("KLM1011"));
    }

    #[test]
    fn bad_crc_never_encodes() {
        let mut mm = position_message();
        mm.crc_ok = false;
        assert!(encode(&mm, None).is_none());
    }

    #[test]
    fn surveillance_altitude_reply_encodes_msg5() {
        let mm = ModeSMessage {
            df: 4,
            crc_ok: true,
            aa: [0x4B, 0x96, 0x96],
            altitude: 35000,
            ..Default::default()
        };
        let line = encode(&mm, None).unwrap();
        assert!(line.starts_with("MSG,5,"));
    }
}
