//! Serde adapter for the API's "unset" timestamps.
//!
//! The remote API never sends `null` for dates. An unset date is the zero
//! instant `0001-01-01T00:00:00Z`, which maps to `None` here and back.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        None => serializer.serialize_str(ZERO_TIME),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let parsed = DateTime::parse_from_rfc3339(&raw)
        .map_err(serde::de::Error::custom)?
        .with_timezone(&Utc);
    Ok(if is_zero(&parsed) { None } else { Some(parsed) })
}

pub fn is_zero(dt: &DateTime<Utc>) -> bool {
    dt.year() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Holder {
        #[serde(default, with = "super")]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_zero_time_is_none() {
        let holder: Holder = serde_json::from_str(r#"{"at":"0001-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(holder.at, None);

        let holder: Holder = serde_json::from_str(r#"{"at":null}"#).unwrap();
        assert_eq!(holder.at, None);

        let holder: Holder = serde_json::from_str("{}").unwrap();
        assert_eq!(holder.at, None);
    }

    #[test]
    fn test_offsets_are_normalised_to_utc() {
        let holder: Holder = serde_json::from_str(r#"{"at":"2025-06-01T10:00:00+02:00"}"#).unwrap();
        let json = serde_json::to_string(&holder).unwrap();
        assert_eq!(json, r#"{"at":"2025-06-01T08:00:00Z"}"#);
    }

    #[test]
    fn test_invalid_timestamp_is_an_error() {
        assert!(serde_json::from_str::<Holder>(r#"{"at":"yesterday"}"#).is_err());
    }
}
