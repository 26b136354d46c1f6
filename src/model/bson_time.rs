//! Optional timestamps stored as native BSON dates, so MongoDB can sort and range-query them.
//!
//! Use with `#[serde(default, with = "crate::model::bson_time")]`. BSON dates carry
//! millisecond precision.

use bson::Bson;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(instant) => bson::DateTime::from_chrono(*instant).serialize(serializer),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bson::DateTime>::deserialize(deserializer)?.map(|instant| instant.to_chrono()))
}

/// Value for `$set` updates.
pub fn to_bson(value: Option<DateTime<Utc>>) -> Bson {
    value.map_or(Bson::Null, |instant| Bson::DateTime(bson::DateTime::from_chrono(instant)))
}
