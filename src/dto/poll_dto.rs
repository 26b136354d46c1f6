use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::poll::{Poll, PollOption};
use crate::service::lifecycle::{self, PollStatus};
use crate::service::results::PollResults;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePollRequest {
    #[validate(length(min = 1, max = 500, message = "Question is required"))]
    pub question: String,
    #[validate(length(min = 2, message = "A poll needs at least 2 options"))]
    pub options: Vec<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePollRequest {
    #[validate(length(min = 1, max = 500, message = "Question is required"))]
    pub question: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OptionRequest {
    #[validate(length(min = 1, max = 200, message = "Option text is required"))]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitVoteRequest {
    pub poll_id: String,
    pub option_id: String,
}

#[derive(Debug, Deserialize)]
pub struct HasVotedQuery {
    pub poll_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionView {
    pub id: String,
    pub text: String,
}

impl From<PollOption> for OptionView {
    fn from(option: PollOption) -> Self {
        OptionView {
            id: option.id.map(|id| id.to_hex()).unwrap_or_default(),
            text: option.text,
        }
    }
}

/// Poll as returned to clients, with its lifecycle status evaluated at a given instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollView {
    pub id: String,
    pub question: String,
    pub is_active: bool,
    pub created_by: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub status: PollStatus,
}

impl PollView {
    pub fn at(poll: &Poll, now: DateTime<Utc>) -> Self {
        PollView {
            id: poll.id.map(|id| id.to_hex()).unwrap_or_default(),
            question: poll.question.clone(),
            is_active: poll.is_active,
            created_by: poll.created_by.to_hex(),
            start_time: poll.start_time,
            end_time: poll.end_time,
            created_at: poll.created_at,
            status: lifecycle::status(poll, now),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PollDetails {
    #[serde(flatten)]
    pub poll: PollView,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollWithResults {
    #[serde(flatten)]
    pub poll: PollView,
    pub results: PollResults,
}

/// Entry of a student's ballot list.
#[derive(Debug, Clone, Serialize)]
pub struct VotablePoll {
    #[serde(flatten)]
    pub poll: PollView,
    pub options: Vec<OptionView>,
    pub has_voted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteReceipt {
    pub vote_id: String,
    pub results: PollResults,
}

#[derive(Debug, Clone, Serialize)]
pub struct HasVotedResponse {
    pub poll_id: String,
    pub has_voted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetVotesResponse {
    pub poll_id: String,
    pub deleted_votes: u64,
}
