use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub question: String,
    pub is_active: bool,
    /// Faculty owner. Only this user may mutate or delete the poll.
    pub created_by: ObjectId,
    #[serde(default, with = "crate::model::bson_time")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::model::bson_time")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::model::bson_time")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Poll {
    pub fn new(
        question: impl Into<String>,
        created_by: ObjectId,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        Poll {
            id: None,
            question: question.into(),
            is_active: true,
            created_by,
            start_time,
            end_time,
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub poll_id: ObjectId,
    pub text: String,
}
