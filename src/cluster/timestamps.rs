// * Bridges API timestamp wrappers (`Time`, `MicroTime`) into chrono.
// * Both wrappers serialize as RFC 3339 strings, so the conversion goes
// * through their wire form instead of their internal representation.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Converts any RFC 3339-serializing timestamp wrapper into UTC.
pub fn to_utc<T: Serialize>(value: &T) -> Option<DateTime<Utc>> {
    match serde_json::to_value(value).ok()? {
        Value::String(raw) => DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc)),
        _ => None,
    }
}

/// Builds a timestamp wrapper from a UTC instant.
pub fn from_utc<T: DeserializeOwned>(instant: DateTime<Utc>) -> Option<T> {
    let wire = instant.to_rfc3339_opts(SecondsFormat::AutoSi, true);
    serde_json::from_value(Value::String(wire)).ok()
}

/// Formats the `YYYY-MM` bucket of an instant.
pub fn month_key(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m").to_string()
}

/// Start of the trailing window of length `interval` ending at `now`.
pub fn window_start(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(interval)
        .ok()
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, Time};

    #[test]
    fn test_time_round_trip() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 0).unwrap();
        let time: Time = from_utc(instant).unwrap();
        assert_eq!(to_utc(&time), Some(instant));
    }

    #[test]
    fn test_micro_time_conversion() {
        let instant = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let micro: MicroTime = from_utc(instant).unwrap();
        assert_eq!(to_utc(&micro), Some(instant));
    }

    #[test]
    fn test_month_key() {
        let instant = Utc.with_ymd_and_hms(2021, 7, 1, 0, 0, 0).unwrap();
        assert_eq!(month_key(instant), "2021-07");
    }

    #[test]
    fn test_window_start() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let start = window_start(now, Duration::from_secs(24 * 60 * 60));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(window_start(now, Duration::MAX), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_non_string_is_none() {
        assert_eq!(to_utc(&42u32), None);
    }
}
