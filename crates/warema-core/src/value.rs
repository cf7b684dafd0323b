//! Lenient parsing of untrusted scalar values.
//!
//! Gateway payloads and MQTT command payloads carry numbers as JSON numbers,
//! as strings, or not at all. These helpers never fail loudly; callers pick
//! their own fallback.

use serde_json::Value;

/// Parse the leading integer of a string.
///
/// Leading whitespace and an optional sign are accepted, parsing stops at the
/// first non-digit: `"40"` -> 40, `" -10deg"` -> -10, `"40.7"` -> 40,
/// `"abc"` -> `None`.
pub fn parse_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let magnitude = rest[..end].parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse the leading integer of a JSON value.
///
/// Numbers are truncated toward zero, strings go through [`parse_int`].
pub fn parse_int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_int(s),
        _ => None,
    }
}

/// Render a JSON value the way it should appear on the bus.
///
/// Strings are used verbatim, `null` becomes an empty string, everything else
/// uses its JSON text.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
