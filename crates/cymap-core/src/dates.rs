//! Date/time dialect parsing.
//!
//! Wire results carry timestamps in several historical formats. Instead
//! of culture-dependent parsing, every dialect is enumerated and tried
//! in a fixed order:
//!
//! 1. legacy epoch notation `/Date(millis)/` and `/Date(millis+HHMM)/`
//! 2. RFC 3339 / ISO-8601 with offset (`...+02:00`, `...+0200`, `...Z`)
//! 3. ISO-8601 without offset (`T` or space separated)
//! 4. date-only `YYYY-MM-DD`
//! 5. legacy slash formats, day-first before month-first
//!
//! Parsed values keep both the instant and its kind (UTC, explicit
//! offset, or unspecified) so reformatting round-trips the input.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MapError;

/// How the offset of a parsed timestamp was specified on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    /// UTC was explicit (`Z` suffix or epoch notation without offset).
    Utc,
    /// A concrete UTC offset was present.
    Offset,
    /// No offset information; the instant is taken at face value.
    Unspecified,
}

/// A parsed wire timestamp: point in time plus offset semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timestamp {
    instant: DateTime<FixedOffset>,
    kind: TimeKind,
}

impl Timestamp {
    pub fn new(instant: DateTime<FixedOffset>, kind: TimeKind) -> Self {
        Self { instant, kind }
    }

    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }

    pub fn kind(&self) -> TimeKind {
        self.kind
    }

    /// Render back to ISO-8601, preserving the kind: `Z` for UTC, the
    /// numeric offset when one was given, no suffix when unspecified.
    pub fn to_iso8601(&self) -> String {
        match self.kind {
            TimeKind::Utc => self.instant.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            TimeKind::Offset => self.instant.to_rfc3339_opts(SecondsFormat::AutoSi, false),
            TimeKind::Unspecified => self
                .instant
                .naive_utc()
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        }
    }
}

/// Parse a timestamp in any accepted dialect.
///
/// Empty or unrecognized text is an error here; optional destinations
/// go through [`parse_opt`] which treats it as "no value".
pub fn parse_any(text: &str) -> Result<Timestamp, MapError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(MapError::UnparseableDate(text.to_string()));
    }

    if let Some(ts) = parse_legacy_epoch(trimmed) {
        return Ok(ts);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        let kind = if trimmed.ends_with(['Z', 'z']) {
            TimeKind::Utc
        } else {
            TimeKind::Offset
        };
        return Ok(Timestamp::new(dt, kind));
    }

    // Offset without a colon (+0200) is not RFC 3339 but shows up in
    // older REST responses.
    if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(Timestamp::new(dt, TimeKind::Offset));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(unspecified(naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(unspecified(naive));
        }
    }

    // Legacy slash dialects; day-first wins over month-first, matching
    // the REST dialect this notation came from.
    for format in [
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%d/%m/%Y",
        "%m/%d/%Y",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(unspecified(naive));
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(unspecified(naive));
            }
        }
    }

    Err(MapError::UnparseableDate(text.to_string()))
}

/// Parse for optional destinations: empty or malformed text is `None`.
pub fn parse_opt(text: &str) -> Option<Timestamp> {
    parse_any(text).ok()
}

fn unspecified(naive: NaiveDateTime) -> Timestamp {
    Timestamp::new(naive.and_utc().fixed_offset(), TimeKind::Unspecified)
}

/// Parse the legacy `/Date(millis±HHMM)/` epoch notation.
///
/// Millis are since the Unix epoch in UTC; the offset, when present,
/// only shifts the rendered wall-clock time.
pub fn parse_legacy_epoch(text: &str) -> Option<Timestamp> {
    let inner = text.strip_prefix("/Date(")?.strip_suffix(")/")?;
    if inner.is_empty() {
        return None;
    }

    // Skip the first char so a leading minus on the millis is not
    // mistaken for the offset sign.
    let sign_pos = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map(|(pos, _)| pos);
    let (millis_text, offset_text) = match sign_pos {
        Some(pos) => inner.split_at(pos),
        None => (inner, ""),
    };

    let millis: i64 = millis_text.parse().ok()?;
    let utc = DateTime::from_timestamp_millis(millis)?;

    if offset_text.is_empty() {
        Some(Timestamp::new(utc.fixed_offset(), TimeKind::Utc))
    } else {
        let offset = parse_hhmm_offset(offset_text)?;
        Some(Timestamp::new(utc.with_timezone(&offset), TimeKind::Offset))
    }
}

fn parse_hhmm_offset(text: &str) -> Option<FixedOffset> {
    let (sign, digits) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimestampVisitor;

        impl Visitor<'_> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a date/time string in an accepted dialect")
            }

            fn visit_str<E: de::Error>(self, text: &str) -> Result<Timestamp, E> {
                parse_any(text).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(TimestampVisitor)
    }
}

/// `#[serde(with = "cymap_core::dates::flexible")]` for raw
/// `DateTime<FixedOffset>` fields that must accept every dialect.
pub mod flexible {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<FixedOffset>, D::Error> {
        let ts = Timestamp::deserialize(deserializer)?;
        Ok(ts.instant())
    }

    pub fn serialize<S: Serializer>(
        value: &DateTime<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }
}

/// Like [`flexible`], for `Option<DateTime<FixedOffset>>`: empty or
/// malformed wire text becomes `None` instead of an error.
pub mod flexible_opt {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<FixedOffset>>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        Ok(text
            .as_deref()
            .and_then(parse_opt)
            .map(|ts| ts.instant()))
    }

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<FixedOffset>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_epoch_with_offset() {
        let ts = parse_any("/Date(1315271562384+0200)/").unwrap();
        assert_eq!(ts.kind(), TimeKind::Offset);
        assert_eq!(ts.to_iso8601(), "2011-09-06T03:12:42.384+02:00");
    }

    #[test]
    fn test_legacy_epoch_negative_offset() {
        let ts = parse_any("/Date(1315271562384-0500)/").unwrap();
        assert_eq!(ts.kind(), TimeKind::Offset);
        assert_eq!(ts.to_iso8601(), "2011-09-05T20:12:42.384-05:00");
    }

    #[test]
    fn test_legacy_epoch_without_offset_is_utc() {
        let ts = parse_any("/Date(0)/").unwrap();
        assert_eq!(ts.kind(), TimeKind::Utc);
        assert_eq!(ts.to_iso8601(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_legacy_epoch_negative_millis() {
        let ts = parse_any("/Date(-86400000)/").unwrap();
        assert_eq!(ts.to_iso8601(), "1969-12-31T00:00:00Z");
    }

    #[test]
    fn test_rfc3339_offset() {
        let ts = parse_any("2011-09-06T03:12:42.384+02:00").unwrap();
        assert_eq!(ts.kind(), TimeKind::Offset);
        assert_eq!(ts.to_iso8601(), "2011-09-06T03:12:42.384+02:00");
    }

    #[test]
    fn test_offset_without_colon() {
        let ts = parse_any("2011-09-06T03:12:42.384+0200").unwrap();
        assert_eq!(ts.kind(), TimeKind::Offset);
        assert_eq!(ts.instant().to_rfc3339(), "2011-09-06T03:12:42.384+02:00");
    }

    #[test]
    fn test_zulu_is_utc_kind() {
        let ts = parse_any("2011-09-06T01:12:42Z").unwrap();
        assert_eq!(ts.kind(), TimeKind::Utc);
        assert_eq!(ts.to_iso8601(), "2011-09-06T01:12:42Z");
    }

    #[test]
    fn test_naive_is_unspecified() {
        let ts = parse_any("2011-09-06T01:12:42").unwrap();
        assert_eq!(ts.kind(), TimeKind::Unspecified);
        assert_eq!(ts.to_iso8601(), "2011-09-06T01:12:42");
    }

    #[test]
    fn test_space_separated_naive() {
        let ts = parse_any("2011-09-06 01:12:42.500").unwrap();
        assert_eq!(ts.kind(), TimeKind::Unspecified);
        assert_eq!(ts.to_iso8601(), "2011-09-06T01:12:42.500");
    }

    #[test]
    fn test_date_only() {
        let ts = parse_any("2011-09-06").unwrap();
        assert_eq!(ts.kind(), TimeKind::Unspecified);
        assert_eq!(ts.to_iso8601(), "2011-09-06T00:00:00");
    }

    #[test]
    fn test_slash_format_day_first_precedence() {
        // Ambiguous between day-first and month-first; day-first wins.
        let ts = parse_any("03/02/2011 10:00:00").unwrap();
        assert_eq!(ts.to_iso8601(), "2011-02-03T10:00:00");
    }

    #[test]
    fn test_slash_format_month_first_fallback() {
        // Day 25 rules out day-first's month position.
        let ts = parse_any("12/25/2011").unwrap();
        assert_eq!(ts.to_iso8601(), "2011-12-25T00:00:00");
    }

    #[test]
    fn test_roundtrip_every_dialect() {
        for input in [
            "/Date(1315271562384+0200)/",
            "2011-09-06T03:12:42.384+02:00",
            "2011-09-06T01:12:42Z",
            "2011-09-06T01:12:42",
            "2011-09-06",
        ] {
            let first = parse_any(input).unwrap();
            let second = parse_any(&first.to_iso8601()).unwrap();
            assert_eq!(first, second, "round-trip failed for {}", input);
        }
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(parse_any("not a date").is_err());
        assert!(parse_any("").is_err());
        assert!(parse_any("/Date(notmillis)/").is_err());
    }

    #[test]
    fn test_parse_opt_absorbs_malformed() {
        assert!(parse_opt("").is_none());
        assert!(parse_opt("   ").is_none());
        assert!(parse_opt("garbage").is_none());
        assert!(parse_opt("2011-09-06").is_some());
    }

    #[test]
    fn test_legacy_epoch_with_non_ascii_text_is_no_value() {
        // Multi-byte characters inside the parentheses must not panic
        // the byte-position scan for the offset sign.
        assert!(parse_opt("/Date(é200)/").is_none());
        assert!(parse_opt("/Date(日時+0200)/").is_none());
        assert!(parse_any("/Date(é200)/").is_err());
    }
}
