use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single ballot. `(user_id, poll_id)` is unique in every store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub poll_id: ObjectId,
    pub option_id: ObjectId,
    #[serde(default, with = "crate::model::bson_time")]
    pub cast_at: Option<DateTime<Utc>>,
}

/// Number of votes cast for one option, as returned by the vote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionTally {
    pub option_id: ObjectId,
    pub count: u64,
}
