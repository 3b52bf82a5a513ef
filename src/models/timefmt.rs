//! Timestamp parsing for service payloads.
//!
//! The service emits naive ISO 8601 timestamps (no offset) and may switch to
//! RFC 3339; both forms parse here, with naive values assumed UTC.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

pub(crate) fn parse_service_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Serde adapter for optional service timestamps.
pub(crate) mod option {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::parse_service_timestamp;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Micros, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse_service_timestamp(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp '{s}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parses_naive_isoformat() {
        let dt = parse_service_timestamp("2026-08-22T09:15:30.123456")
            .expect("naive isoformat should parse");
        assert_eq!(dt.hour(), 9);
        assert_eq!(dt.timestamp_subsec_micros(), 123456);
    }

    #[test]
    fn test_parses_naive_without_fraction() {
        assert!(parse_service_timestamp("2026-08-22T09:15:30").is_some());
    }

    #[test]
    fn test_parses_rfc3339() {
        let dt = parse_service_timestamp("2026-08-22T09:15:30+02:00")
            .expect("rfc3339 should parse");
        assert_eq!(dt.hour(), 7);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_service_timestamp("yesterday").is_none());
    }
}
