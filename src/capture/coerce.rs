//! Typed coercion of raw query-string scalars.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A query value after coercion from its raw (already URL-decoded) string.
///
/// Coercion is lossy: `"007"` becomes `Int(7)` and the leading zeros are gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParsedValue {
    /// Case-insensitive `null`.
    Null,
    /// Case-insensitive `true` / `false`.
    Bool(bool),
    /// Only ASCII digits, within `i64` range.
    ///
    /// A digit run too large for `i64` is kept as [`ParsedValue::String`]
    /// instead, so the raw text is never rounded.
    Int(i64),
    /// ASCII digits with exactly one `.`.
    Float(f64),
    /// Anything else, unmodified.
    String(String),
}

/// Coerces a raw scalar into a [`ParsedValue`].
///
/// The order of the checks is fixed: empty string, `null`, booleans,
/// integers, floats, then the raw string. A digit run too large for `i64`
/// stays a string.
#[must_use]
pub fn coerce(raw: &str) -> ParsedValue {
    if raw.is_empty() {
        return ParsedValue::String(String::new());
    }
    if raw.eq_ignore_ascii_case("null") {
        return ParsedValue::Null;
    }
    if raw.eq_ignore_ascii_case("true") {
        return ParsedValue::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return ParsedValue::Bool(false);
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse().map_or_else(|_| ParsedValue::String(raw.to_string()), ParsedValue::Int);
    }
    if is_decimal(raw) {
        if let Ok(value) = raw.parse() {
            return ParsedValue::Float(value);
        }
    }
    ParsedValue::String(raw.to_string())
}

/// Exactly one `.` and at least one digit, nothing else.
fn is_decimal(raw: &str) -> bool {
    let dots = raw.bytes().filter(|&b| b == b'.').count();
    let digits = raw.bytes().filter(u8::is_ascii_digit).count();
    dots == 1 && digits > 0 && digits + dots == raw.len()
}

impl ParsedValue {
    /// Returns `true` for `Null` and the empty string.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Canonical, type-tagged text used for grouping and ordering.
    ///
    /// `Int(7)` and `String("7")` produce different keys.
    #[must_use]
    pub fn signature_key(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::String(s) => serde_json::Value::String(s.clone()).to_string(),
        }
    }

    /// Total order over coerced values.
    ///
    /// Values rank `Null < Bool < number < String`. Numbers compare by value
    /// whether `Int` or `Float`, with `Int` first on a tie; strings compare
    /// lexicographically.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Self::Float(a), Self::Int(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::String(_) => 3,
        }
    }
}

impl fmt::Display for ParsedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => f.write_str(&format_float(*x)),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// Formats a float so whole values keep a trailing `.0`.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
