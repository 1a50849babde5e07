use time::{
    format_description::well_known::{Iso8601, Rfc3339},
    Date, Duration, OffsetDateTime, PrimitiveDateTime,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid date: {0:?}")]
pub struct DateError(pub String);

/// Parses a date as sent by the admin frontend.
///
/// Accepts RFC 3339 timestamps, ISO 8601 date-times with or without offset
/// (no offset means UTC) and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(value: &str) -> Result<OffsetDateTime, DateError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DateError(value.to_string()));
    }
    if let Ok(dt) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(dt);
    }
    if let Ok(dt) = OffsetDateTime::parse(value, &Iso8601::DEFAULT) {
        return Ok(dt);
    }
    if let Ok(dt) = PrimitiveDateTime::parse(value, &Iso8601::DEFAULT) {
        return Ok(dt.assume_utc());
    }
    Date::parse(value, &Iso8601::DEFAULT)
        .map(|d| d.midnight().assume_utc())
        .map_err(|_| DateError(value.to_string()))
}

/// Current UTC time truncated to milliseconds, the precision browsers keep.
pub fn now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - Duration::nanoseconds((now.nanosecond() % 1_000_000) as i64)
}

/// Serde adapter: writes RFC 3339, reads anything [`parse_date`] accepts.
pub mod flexible {
    use serde::{Deserialize as _, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        time::serde::rfc3339::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let value = String::deserialize(deserializer)?;
        super::parse_date(&value).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize as _, Deserializer, Serializer};
        use time::OffsetDateTime;

        pub fn serialize<S: Serializer>(
            value: &Option<OffsetDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            time::serde::rfc3339::option::serialize(value, serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<OffsetDateTime>, D::Error> {
            let value = Option::<String>::deserialize(deserializer)?;
            value
                .map(|v| super::super::parse_date(&v).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_date("2024-05-01T18:30:00Z").unwrap();
        assert_eq!(dt, datetime!(2024-05-01 18:30 UTC));

        let dt = parse_date("2024-05-01T18:30:00.000+02:00").unwrap();
        assert_eq!(dt, datetime!(2024-05-01 16:30 UTC));
    }

    #[test]
    fn test_parse_without_offset() {
        let dt = parse_date("2024-05-01T18:30:00").unwrap();
        assert_eq!(dt, datetime!(2024-05-01 18:30 UTC));
    }

    #[test]
    fn test_parse_plain_date() {
        let dt = parse_date("2023-12-24").unwrap();
        assert_eq!(dt, datetime!(2023-12-24 0:00 UTC));
    }

    #[test]
    fn test_parse_invalid() {
        for value in ["", "   ", "yesterday", "2024-13-01", "2024-02-30", "01/05/2024"] {
            assert!(parse_date(value).is_err(), "{value:?} should not parse");
        }
    }

    #[test]
    fn test_now_is_millisecond_precision() {
        assert_eq!(now().nanosecond() % 1_000_000, 0);
    }
}
