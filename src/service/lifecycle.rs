//! Poll votability as a function of the active flag, the schedule, and the current instant.
//!
//! Evaluated on every request; nothing caches the result because it changes with the
//! clock alone. `start_time` is inclusive and `end_time` exclusive, so at the exact
//! boundary instant a poll is never both just closed and about to open.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::poll::Poll;
use crate::util::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    /// Switched off by its owner.
    Inactive,
    /// Active but `start_time` is still ahead.
    Scheduled,
    Open,
    /// Active but `end_time` has passed.
    Closed,
}

pub fn status(poll: &Poll, at: DateTime<Utc>) -> PollStatus {
    if !poll.is_active {
        return PollStatus::Inactive;
    }
    if poll.start_time.map_or(false, |start| at < start) {
        return PollStatus::Scheduled;
    }
    if poll.end_time.map_or(false, |end| at >= end) {
        return PollStatus::Closed;
    }
    PollStatus::Open
}

pub fn is_votable(poll: &Poll, at: DateTime<Utc>) -> bool {
    status(poll, at) == PollStatus::Open
}

/// A schedule with both bounds must open strictly before it closes.
pub fn validate_schedule(start_time: Option<DateTime<Utc>>, end_time: Option<DateTime<Utc>>) -> Result<(), ServiceError> {
    match (start_time, end_time) {
        (Some(start), Some(end)) if start >= end => Err(ServiceError::InvalidInput(
            "Start time must be before end time".to_string(),
        )),
        _ => Ok(()),
    }
}
