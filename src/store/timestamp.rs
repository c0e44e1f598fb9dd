//! Timestamps as stored in documents: UTC RFC 3339 with a fixed nine-digit
//! fraction, so the text of two timestamps sorts the same way as the instants.
//! Reading accepts any RFC 3339 value.

use serde::{Deserialize, Deserializer, Serializer};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime, UtcOffset,
};

use super::{StoreError, StoreResult};

pub fn format(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.to_offset(UtcOffset::UTC).format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
    ))
}

pub fn now() -> StoreResult<String> {
    format(OffsetDateTime::now_utc())
        .map_err(|e| StoreError::Unavailable(format!("clock formatting: {e}")))
}

pub fn serialize<S: Serializer>(at: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    let text = format(*at).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&text)
}

pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<OffsetDateTime, D::Error> {
    let text = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&text, &Rfc3339).map_err(serde::de::Error::custom)
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        at: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match at {
            Some(at) => {
                let text = format(*at).map_err(serde::ser::Error::custom)?;
                serializer.serialize_some(&text)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| OffsetDateTime::parse(&text, &Rfc3339).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use time::macros::datetime;

    #[derive(Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "super")]
        at: OffsetDateTime,
        #[serde(default, with = "super::option")]
        seen: Option<OffsetDateTime>,
    }

    #[test]
    fn text_order_matches_time_order_within_a_second() {
        let older = format(datetime!(2026-03-01 10:00:00.500 UTC)).unwrap();
        let newer = format(datetime!(2026-03-01 10:00:00.510 UTC)).unwrap();
        assert_eq!(older, "2026-03-01T10:00:00.500000000Z");
        assert_eq!(newer, "2026-03-01T10:00:00.510000000Z");
        assert!(older < newer);

        let whole = format(datetime!(2026-03-01 10:00:01 UTC)).unwrap();
        assert!(newer < whole);
    }

    #[test]
    fn offsets_are_written_as_utc() {
        let at = datetime!(2026-03-01 12:00:00 +02:00);
        assert_eq!(format(at).unwrap(), "2026-03-01T10:00:00.000000000Z");
    }

    #[test]
    fn reads_short_fractions_and_writes_fixed_width() {
        let parsed: Stamped =
            serde_json::from_str(r#"{"at":"2026-03-01T10:00:00.5Z","seen":null}"#).unwrap();
        assert_eq!(parsed.at, datetime!(2026-03-01 10:00:00.5 UTC));
        assert!(parsed.seen.is_none());

        let value = serde_json::to_value(Stamped {
            at: parsed.at,
            seen: Some(parsed.at),
        })
        .unwrap();
        assert_eq!(value["at"], "2026-03-01T10:00:00.500000000Z");
        assert_eq!(value["seen"], "2026-03-01T10:00:00.500000000Z");
    }
}
