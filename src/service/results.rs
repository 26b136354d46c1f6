use serde::Serialize;

use crate::model::poll::{Poll, PollOption};
use crate::model::vote::OptionTally;
use crate::repository::poll_repo::PollRepository;
use crate::repository::vote_repo::VoteRepository;
use crate::util::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionResult {
    pub option_id: String,
    pub text: String,
    pub vote_count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollResults {
    pub poll_id: String,
    pub question: String,
    pub total_votes: u64,
    pub results: Vec<OptionResult>,
}

/// Percentage rounded to two decimals; zero when nobody voted.
/// Rounded values are reported as-is and may not sum to exactly 100.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 10_000.0 / total as f64).round() / 100.0
}

/// Builds the per-option breakdown. Every option appears, including those with no votes,
/// in the order `options` is given.
pub fn aggregate(poll: &Poll, options: &[PollOption], tallies: &[OptionTally]) -> PollResults {
    let count_for = |option: &PollOption| -> u64 {
        tallies
            .iter()
            .filter(|t| Some(t.option_id) == option.id)
            .map(|t| t.count)
            .sum()
    };

    let counts: Vec<u64> = options.iter().map(count_for).collect();
    let total_votes: u64 = counts.iter().sum();

    let results = options
        .iter()
        .zip(counts)
        .map(|(option, vote_count)| OptionResult {
            option_id: option.id.map(|id| id.to_hex()).unwrap_or_default(),
            text: option.text.clone(),
            vote_count,
            percentage: percentage(vote_count, total_votes),
        })
        .collect();

    PollResults {
        poll_id: poll.id.map(|id| id.to_hex()).unwrap_or_default(),
        question: poll.question.clone(),
        total_votes,
        results,
    }
}

/// Loads options and tallies for `poll` and aggregates them.
pub async fn load(
    poll_repo: &dyn PollRepository,
    vote_repo: &dyn VoteRepository,
    poll: &Poll,
) -> Result<PollResults, ServiceError> {
    let poll_id = poll
        .id
        .ok_or_else(|| ServiceError::InternalError("Stored poll without id".to_string()))?;
    let options = poll_repo.list_options(&poll_id).await?;
    let tallies = vote_repo.tally(&poll_id).await?;
    Ok(aggregate(poll, &options, &tallies))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    fn fixture(texts: &[&str]) -> (Poll, Vec<PollOption>) {
        let mut poll = Poll::new("Lunch?", ObjectId::new(), None, None);
        let poll_id = ObjectId::new();
        poll.id = Some(poll_id);
        let options = texts
            .iter()
            .map(|text| PollOption { id: Some(ObjectId::new()), poll_id, text: text.to_string() })
            .collect();
        (poll, options)
    }

    #[test]
    fn test_three_to_one_split() {
        let (poll, options) = fixture(&["Pizza", "Salad"]);
        let tallies = vec![
            OptionTally { option_id: options[0].id.unwrap(), count: 3 },
            OptionTally { option_id: options[1].id.unwrap(), count: 1 },
        ];

        let results = aggregate(&poll, &options, &tallies);
        assert_eq!(results.total_votes, 4);
        assert_eq!(results.results[0].vote_count, 3);
        assert_eq!(results.results[0].percentage, 75.0);
        assert_eq!(results.results[1].percentage, 25.0);
    }

    #[test]
    fn test_no_votes_yields_zero_percentages() {
        let (poll, options) = fixture(&["A", "B", "C"]);
        let results = aggregate(&poll, &options, &[]);
        assert_eq!(results.total_votes, 0);
        assert_eq!(results.results.len(), 3);
        assert!(results.results.iter().all(|r| r.vote_count == 0 && r.percentage == 0.0));
    }

    #[test]
    fn test_thirds_round_to_two_decimals_without_normalising() {
        let (poll, options) = fixture(&["A", "B", "C"]);
        let tallies: Vec<OptionTally> =
            options.iter().map(|o| OptionTally { option_id: o.id.unwrap(), count: 1 }).collect();

        let results = aggregate(&poll, &options, &tallies);
        assert!(results.results.iter().all(|r| r.percentage == 33.33));
        let sum: f64 = results.results.iter().map(|r| r.percentage).sum();
        assert!((sum - 99.99).abs() < 1e-9);
    }

    #[test]
    fn test_percentage_helper() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(5, 5), 100.0);
    }
}
