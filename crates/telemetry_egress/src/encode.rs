//! Identifier and field encoding.
//!
//! Every function here is total: unknown inputs degrade to sentinel strings so
//! a single odd attribute never costs the whole span.

use crate::model::{AttributeValue, SpanId, TraceId};
use std::time::{SystemTime, UNIX_EPOCH};

/// Returned by [`encode_value`] for values with no wire representation.
pub const UNSUPPORTED_VALUE: &str = "<unsupported value type>";

/// Returned by [`encode_enum`] for out-of-range indices.
pub const UNKNOWN_ENUM: &str = "unknown";

const NANOS_PER_MILLI: i128 = 1_000_000;

/// Formats a trace id as a dashed UUID (`8-4-4-4-12` lower-case hex digits).
pub fn encode_trace_id(id: &TraceId) -> String {
    let b = id.as_bytes();
    format!(
        "{}-{}-{}-{}-{}",
        hex::encode(&b[..4]),
        hex::encode(&b[4..6]),
        hex::encode(&b[6..8]),
        hex::encode(&b[8..10]),
        hex::encode(&b[10..])
    )
}

/// Formats a span id as a dashed UUID whose first three groups are zero.
pub fn encode_span_id(id: &SpanId) -> String {
    let b = id.as_bytes();
    format!(
        "00000000-0000-0000-{}-{}",
        hex::encode(&b[..2]),
        hex::encode(&b[2..])
    )
}

/// Renders an attribute value as a string.
pub fn encode_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::String(s) => s.clone(),
        AttributeValue::Int(i) => encode_int(*i),
        AttributeValue::Float(f) => encode_float(*f),
        AttributeValue::Bool(b) => b.to_string(),
        AttributeValue::Array(_) => UNSUPPORTED_VALUE.to_string(),
    }
}

pub fn encode_int(value: i64) -> String {
    value.to_string()
}

/// Shortest decimal that round-trips, never in exponent form.
pub fn encode_float(value: f64) -> String {
    if value.is_infinite() {
        let inf = if value.is_sign_positive() { "+Inf" } else { "-Inf" };
        inf.to_string()
    } else {
        // Display for f64 is already shortest round-trip and exponent free.
        value.to_string()
    }
}

/// Looks up `table[index]`, falling back to `"unknown"`.
pub fn encode_enum<'a>(index: i64, table: &[&'a str]) -> &'a str {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i).copied())
        .unwrap_or(UNKNOWN_ENUM)
}

/// Whole milliseconds since the Unix epoch, truncated toward zero.
pub fn unix_millis(time: SystemTime) -> i64 {
    (unix_nanos(time) / NANOS_PER_MILLI) as i64
}

/// Whole milliseconds from `start` to `end`, truncated toward zero.
pub fn duration_millis(start: SystemTime, end: SystemTime) -> i64 {
    ((unix_nanos(end) - unix_nanos(start)) / NANOS_PER_MILLI) as i64
}

fn unix_nanos(time: SystemTime) -> i128 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_nanos() as i128,
        Err(before) => -(before.duration().as_nanos() as i128),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_trace_id_layout() {
        let id = TraceId::from_bytes([
            0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54,
            0x32, 0x10,
        ]);
        assert_eq!(encode_trace_id(&id), "01234567-89ab-cdef-fedc-ba9876543210");
        assert_eq!(
            encode_trace_id(&TraceId::INVALID),
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_span_id_layout() {
        let id = SpanId::from_bytes([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x02, 0x03]);
        assert_eq!(encode_span_id(&id), "00000000-0000-0000-dead-beef00010203");
    }

    #[test]
    fn test_encode_value_kinds() {
        assert_eq!(encode_value(&"bar".into()), "bar");
        assert_eq!(encode_value(&AttributeValue::Int(-42)), "-42");
        assert_eq!(encode_value(&AttributeValue::Float(5.25)), "5.25");
        assert_eq!(encode_value(&AttributeValue::Float(0.1)), "0.1");
        assert_eq!(encode_value(&AttributeValue::Float(1e21)), "1000000000000000000000");
        assert_eq!(encode_value(&AttributeValue::Float(f64::INFINITY)), "+Inf");
        assert_eq!(encode_value(&AttributeValue::Bool(true)), "true");
        assert_eq!(encode_value(&AttributeValue::Bool(false)), "false");
        assert_eq!(
            encode_value(&AttributeValue::Array(vec!["a".into()])),
            UNSUPPORTED_VALUE
        );
    }

    #[test]
    fn test_encode_enum_bounds() {
        let table = ["a", "b", "c"];
        assert_eq!(encode_enum(0, &table), "a");
        assert_eq!(encode_enum(2, &table), "c");
        assert_eq!(encode_enum(3, &table), UNKNOWN_ENUM);
        assert_eq!(encode_enum(-1, &table), UNKNOWN_ENUM);
        assert_eq!(encode_enum(0, &[]), UNKNOWN_ENUM);
    }

    #[test]
    fn test_millis_truncate_toward_zero() {
        let t = UNIX_EPOCH + Duration::from_nanos(1_999_999);
        assert_eq!(unix_millis(t), 1);

        let before = UNIX_EPOCH - Duration::from_nanos(1_500_000);
        assert_eq!(unix_millis(before), -1);

        let start = UNIX_EPOCH + Duration::from_millis(10);
        let end = start + Duration::from_micros(2_999);
        assert_eq!(duration_millis(start, end), 2);
        assert_eq!(duration_millis(end, start), -2);
    }
}
