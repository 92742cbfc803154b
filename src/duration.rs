//! Duration codec: converts between the two SCORM duration text encodings
//! and an integer-seconds value.
//!
//! SCORM 1.2 uses `hhhh:mm:ss.cc` timespans; SCORM 2004 uses ISO-8601-style
//! `PnYnMnDTnHnMnS` durations. Fractional seconds are truncated toward zero.

/// Parse either encoding, auto-detected by prefix.
pub fn parse_duration(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.starts_with('P') {
        parse_iso8601(raw)
    } else {
        parse_timespan(raw)
    }
}

/// Parse a SCORM 1.2 `hhhh:mm:ss(.cc)` timespan into seconds.
pub fn parse_timespan(raw: &str) -> Option<i64> {
    let mut parts = raw.split(':');
    let hours = parts.next()?;
    let minutes = parts.next()?;
    let seconds = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if hours.is_empty() || hours.len() > 4 || !hours.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let h: i64 = hours.parse().ok()?;
    let m: i64 = parse_two_digit(minutes, 59)?;
    // Seconds may carry a centisecond fraction, truncated.
    let s_whole = seconds.split('.').next()?;
    let frac = &seconds[s_whole.len()..];
    if !frac.is_empty() && (frac.len() > 3 || !frac[1..].bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    let s: i64 = parse_two_digit(s_whole, 59)?;
    Some(h * 3600 + m * 60 + s)
}

fn parse_two_digit(field: &str, max: i64) -> Option<i64> {
    if field.is_empty() || field.len() > 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let v: i64 = field.parse().ok()?;
    if v > max {
        return None;
    }
    Some(v)
}

/// Parse an ISO-8601 `PnYnMnDTnHnMnS` duration into seconds. Years and
/// months use the SCORM RTE conventions of 365 and 30 days.
pub fn parse_iso8601(raw: &str) -> Option<i64> {
    let rest = raw.strip_prefix('P')?;
    let mut total: i64 = 0;
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;

    for ch in rest.chars() {
        match ch {
            'T' => {
                if in_time || !number.is_empty() {
                    return None;
                }
                in_time = true;
            }
            '0'..='9' | '.' => number.push(ch),
            'Y' | 'M' | 'D' | 'H' | 'S' => {
                if number.is_empty() {
                    return None;
                }
                // Only the seconds component may carry a fraction.
                let value: f64 = number.parse().ok()?;
                if number.contains('.') && !(in_time && ch == 'S') {
                    return None;
                }
                let unit = match (ch, in_time) {
                    ('Y', false) => 365 * 86_400,
                    ('M', false) => 30 * 86_400,
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return None,
                };
                total += (value * unit as f64).trunc() as i64;
                number.clear();
                saw_component = true;
            }
            _ => return None,
        }
    }
    if !number.is_empty() || !saw_component {
        return None;
    }
    Some(total)
}

/// Format seconds as a SCORM 1.2 `hhhh:mm:ss` timespan.
pub fn format_timespan(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:04}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Format seconds as a SCORM 2004 `PT#H#M#S` duration.
pub fn format_iso8601(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "PT{}H{}M{}S",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timespans() {
        assert_eq!(parse_timespan("0000:00:00"), Some(0));
        assert_eq!(parse_timespan("00:01:30"), Some(90));
        assert_eq!(parse_timespan("0001:00:00"), Some(3600));
        assert_eq!(parse_timespan("1234:56:59"), Some(1234 * 3600 + 56 * 60 + 59));
        assert_eq!(parse_timespan("00:00:12.34"), Some(12));
        assert_eq!(parse_timespan("2:30:00"), Some(9000));
    }

    #[test]
    fn rejects_malformed_timespans() {
        assert_eq!(parse_timespan(""), None);
        assert_eq!(parse_timespan("00:60:00"), None);
        assert_eq!(parse_timespan("00:00:61"), None);
        assert_eq!(parse_timespan("12345:00:00"), None);
        assert_eq!(parse_timespan("00:00"), None);
        assert_eq!(parse_timespan("aa:bb:cc"), None);
        assert_eq!(parse_timespan("00:00:00:00"), None);
    }

    #[test]
    fn parses_iso8601_durations() {
        assert_eq!(parse_iso8601("PT0H0M0S"), Some(0));
        assert_eq!(parse_iso8601("PT1H30M"), Some(5400));
        assert_eq!(parse_iso8601("PT90S"), Some(90));
        assert_eq!(parse_iso8601("PT12.7S"), Some(12));
        assert_eq!(parse_iso8601("P1DT1H"), Some(90_000));
        assert_eq!(parse_iso8601("P1Y"), Some(365 * 86_400));
    }

    #[test]
    fn rejects_malformed_iso8601() {
        assert_eq!(parse_iso8601("P"), None);
        assert_eq!(parse_iso8601("PT"), None);
        assert_eq!(parse_iso8601("PTXS"), None);
        assert_eq!(parse_iso8601("PT1H2"), None);
        assert_eq!(parse_iso8601("P1.5D"), None);
        assert_eq!(parse_iso8601("1H"), None);
    }

    #[test]
    fn auto_detects_by_prefix() {
        assert_eq!(parse_duration("PT2H"), Some(7200));
        assert_eq!(parse_duration("0002:00:00"), Some(7200));
        assert_eq!(parse_duration("  PT2H  "), Some(7200));
    }

    #[test]
    fn round_trips_on_seconds() {
        for s in [0i64, 1, 59, 60, 3599, 3600, 86_399, 400_000] {
            assert_eq!(parse_timespan(&format_timespan(s)), Some(s));
            assert_eq!(parse_iso8601(&format_iso8601(s)), Some(s));
        }
        // decode(format(decode(s))) == decode(s) for valid inputs of both kinds
        for raw in ["00:10:05.50", "PT1H5M2.9S"] {
            let v = parse_duration(raw).unwrap();
            assert_eq!(parse_duration(&format_timespan(v)), Some(v));
            assert_eq!(parse_duration(&format_iso8601(v)), Some(v));
        }
    }

    #[test]
    fn formatting_clamps_negatives() {
        assert_eq!(format_timespan(-5), "0000:00:00");
        assert_eq!(format_iso8601(-5), "PT0H0M0S");
    }
}
