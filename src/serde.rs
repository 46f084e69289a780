use std::borrow::Cow;

use serde::{de::Error, Deserialize, Deserializer};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

// GitHub timestamps are always UTC and always spelled with a trailing `Z`
const FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T\
    [hour]:[minute]:[second]Z\
    [offset_hour sign:mandatory][offset_minute]"
);

fn parse_utc(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(&format!("{s}+0000"), &FORMAT)
}

pub fn optional_utc_date_time<'de, D>(deser: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    <Option<Cow<'_, str>>>::deserialize(deser)?
        .map(|s| parse_utc(&s))
        .transpose()
        .map_err(Error::custom)
}
