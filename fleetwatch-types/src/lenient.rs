//! Forgiving decoders for measurement fields.
//!
//! Agents report numbers as integers, floats, strings or `null` depending on
//! their version. A field that cannot be read as a number decodes to zero.
//! A timestamp that cannot be read decodes to the epoch, so one bad record
//! never fails the whole snapshot.

use std::fmt;

use chrono::{TimeZone, Utc};

use crate::Timestamp;

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

pub(crate) fn u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(NumberVisitor).map(|v| {
        if v.is_finite() && v > 0.0 {
            v as u64
        } else {
            0
        }
    })
}

pub(crate) fn f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer
        .deserialize_any(NumberVisitor)
        .map(|v| if v.is_finite() { v } else { 0.0 })
}

/// `null` decodes to `T::default()`.
pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// RFC 3339 strings or epoch milliseconds; anything else is the epoch.
pub(crate) fn timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer
        .deserialize_any(TimestampVisitor)
        .map(Option::unwrap_or_default)
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Option<Timestamp>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an RFC 3339 timestamp")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(v.trim().parse::<Timestamp>().ok())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Utc.timestamp_millis_opt(v).single())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(i64::try_from(v)
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(None)
    }
}

struct NumberVisitor;

impl<'de> Visitor<'de> for NumberVisitor {
    type Value = f64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Ok(v)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<f64, E> {
        Ok(0.0)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
        Ok(v.trim().parse().unwrap_or(0.0))
    }

    fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
        Ok(0.0)
    }

    fn visit_none<E: de::Error>(self) -> Result<f64, E> {
        Ok(0.0)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<f64, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(0.0)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<f64, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(0.0)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "super::u64")]
        count: u64,
        #[serde(default, deserialize_with = "super::f64")]
        ratio: f64,
    }

    fn probe(json: &str) -> Probe {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn accepts_plain_numbers() {
        let p = probe(r#"{"count": 42, "ratio": 0.5}"#);
        assert_eq!(p.count, 42);
        assert_eq!(p.ratio, 0.5);
    }

    #[test]
    fn floats_truncate_into_counters() {
        assert_eq!(probe(r#"{"count": 41.9}"#).count, 41);
    }

    #[test]
    fn negative_counters_clamp_to_zero() {
        assert_eq!(probe(r#"{"count": -5}"#).count, 0);
    }

    #[test]
    fn numeric_strings_are_parsed() {
        let p = probe(r#"{"count": "17", "ratio": " 2.5 "}"#);
        assert_eq!(p.count, 17);
        assert_eq!(p.ratio, 2.5);
    }

    #[test]
    fn garbage_becomes_zero() {
        let p = probe(r#"{"count": "n/a", "ratio": [1, 2, 3]}"#);
        assert_eq!(p.count, 0);
        assert_eq!(p.ratio, 0.0);

        let p = probe(r#"{"count": {"nested": true}, "ratio": null}"#);
        assert_eq!(p.count, 0);
        assert_eq!(p.ratio, 0.0);
    }

    #[test]
    fn missing_fields_default() {
        let p = probe("{}");
        assert_eq!(p.count, 0);
        assert_eq!(p.ratio, 0.0);
    }

    #[derive(Debug, Deserialize)]
    struct Stamped {
        #[serde(default, deserialize_with = "super::timestamp")]
        at: crate::Timestamp,
    }

    fn stamp(json: &str) -> i64 {
        serde_json::from_str::<Stamped>(json).unwrap().at.timestamp()
    }

    #[test]
    fn timestamps_accept_rfc3339_and_millis() {
        assert_eq!(stamp(r#"{"at": "2025-01-01T00:00:00Z"}"#), 1_735_689_600);
        assert_eq!(stamp(r#"{"at": "2025-01-01T08:00:00+08:00"}"#), 1_735_689_600);
        assert_eq!(stamp(r#"{"at": 1735689600000}"#), 1_735_689_600);
    }

    #[test]
    fn unreadable_timestamps_become_epoch() {
        assert_eq!(stamp(r#"{"at": null}"#), 0);
        assert_eq!(stamp(r#"{"at": "yesterday"}"#), 0);
        assert_eq!(stamp(r#"{"at": {"seconds": 5}}"#), 0);
        assert_eq!(stamp("{}"), 0);
    }

    #[test]
    fn one_bad_timestamp_keeps_the_snapshot() {
        let json = r#"{
            "online": ["a", "b"],
            "data": {
                "a": {"cpu": {"usage": 12.5}, "updated_at": "2025-01-01T00:00:00Z"},
                "b": {"cpu": {"usage": 40}, "updated_at": null}
            }
        }"#;

        let snapshot: crate::Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.record("a").unwrap().updated_at.timestamp(), 1_735_689_600);
        assert_eq!(snapshot.record("b").unwrap().updated_at.timestamp(), 0);
        assert_eq!(snapshot.record("b").unwrap().cpu.usage, 40.0);
    }
}
