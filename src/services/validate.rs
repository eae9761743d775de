//! Field validation over loosely-typed JSON request bodies.
//!
//! Request bodies are parsed leniently (malformed JSON becomes `{}`), so every
//! field is looked up by name and type-checked here. A helper returns `None`
//! when the field is absent, of the wrong JSON type, or out of range; callers
//! decide whether that is fatal.

use std::ops::RangeInclusive;

use serde_json::Value;

/// A JSON string whose trimmed form is non-empty. Returns the untrimmed input.
#[must_use]
pub fn non_empty_str<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// A JSON string whose trimmed length is exactly `len`. Returns the trimmed form.
#[must_use]
pub fn exact_len_str(raw: Option<&str>, len: usize) -> Option<&str> {
    raw.map(str::trim).filter(|s| s.chars().count() == len)
}

/// A non-empty (after trimming) optional query or body value.
#[must_use]
pub fn present(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.trim().is_empty())
}

/// A JSON boolean.
#[must_use]
pub fn boolean(body: &Value, key: &str) -> Option<bool> {
    body.get(key).and_then(Value::as_bool)
}

/// A JSON integer within `range`. Floats with no fractional part count as integers.
#[must_use]
pub fn int_in_range(body: &Value, key: &str, range: RangeInclusive<i64>) -> Option<i64> {
    let value = body.get(key)?;
    let n = match value.as_i64() {
        Some(n) => n,
        None => whole_number(value.as_f64()?)?,
    };
    range.contains(&n).then_some(n)
}

#[allow(clippy::cast_possible_truncation)]
fn whole_number(f: f64) -> Option<i64> {
    // Bounds keep the cast exact.
    (f.fract() == 0.0 && f.abs() < 9.0e15).then_some(f as i64)
}

/// A JSON array of HTTP status codes (integers in 100..=599).
#[must_use]
pub fn status_codes(body: &Value, key: &str) -> Option<Vec<u16>> {
    body.get(key)?
        .as_array()?
        .iter()
        .map(|v| v.as_u64().filter(|n| (100..=599).contains(n)).and_then(|n| u16::try_from(n).ok()))
        .collect()
}

/// Strip one wrapping `"` from each end, as sent by clients that quote query values.
#[must_use]
pub fn strip_wrapping_quotes(raw: &str) -> &str {
    let raw = raw.strip_prefix('"').unwrap_or(raw);
    raw.strip_suffix('"').unwrap_or(raw)
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
