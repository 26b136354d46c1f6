use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{info, instrument, warn};

use crate::dto::poll_dto::{HasVotedResponse, VoteReceipt};
use crate::model::poll::Poll;
use crate::model::vote::Vote;
use crate::repository::poll_repo::PollRepository;
use crate::repository::repository_error::RepositoryError;
use crate::repository::vote_repo::VoteRepository;
use crate::service::lifecycle;
use crate::service::policy::{enforce, Actor, DenyReason, Operation};
use crate::service::results;
use crate::util::clock::Clock;
use crate::util::error::ServiceError;

#[async_trait]
pub trait VoteService: Send + Sync {
    /// Records the actor's single vote on a poll and returns the updated results.
    async fn submit_vote(&self, actor: &Actor, poll_id: &ObjectId, option_id: &ObjectId)
        -> Result<VoteReceipt, ServiceError>;
    async fn has_voted(&self, actor: &Actor, poll_id: &ObjectId) -> Result<HasVotedResponse, ServiceError>;
}

pub struct VoteServiceImpl {
    pub poll_repo: Arc<dyn PollRepository>,
    pub vote_repo: Arc<dyn VoteRepository>,
    pub clock: Arc<dyn Clock>,
}

impl VoteServiceImpl {
    pub fn new(poll_repo: Arc<dyn PollRepository>, vote_repo: Arc<dyn VoteRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { poll_repo, vote_repo, clock }
    }

    async fn load_poll(&self, poll_id: &ObjectId) -> Result<Poll, ServiceError> {
        self.poll_repo
            .get_by_id(poll_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Poll not found".to_string()))
    }
}

#[async_trait]
impl VoteService for VoteServiceImpl {
    #[instrument(skip(self), fields(actor = %actor.id))]
    async fn submit_vote(
        &self,
        actor: &Actor,
        poll_id: &ObjectId,
        option_id: &ObjectId,
    ) -> Result<VoteReceipt, ServiceError> {
        enforce(actor, Operation::CastVote)?;
        let poll = self.load_poll(poll_id).await?;
        let now = self.clock.now();

        let option_in_poll = self
            .poll_repo
            .get_option(option_id)
            .await?
            .map_or(false, |option| option.poll_id == *poll_id);
        let already_voted = self.vote_repo.has_voted(&actor.id, poll_id).await?;

        enforce(
            actor,
            Operation::SubmitVote { votable: lifecycle::is_votable(&poll, now), option_in_poll, already_voted },
        )?;

        let vote = Vote { id: None, user_id: actor.id, poll_id: *poll_id, option_id: *option_id, cast_at: Some(now) };

        // The unique (user, poll) constraint decides races the read above cannot see.
        let vote = match self.vote_repo.insert(vote).await {
            Ok(vote) => vote,
            Err(RepositoryError::AlreadyExists(_)) => {
                warn!("Concurrent duplicate vote rejected by store");
                return Err(DenyReason::AlreadyVoted.into());
            }
            Err(e) => return Err(e.into()),
        };
        info!(vote_id = ?vote.id, "Vote recorded");

        let results = results::load(self.poll_repo.as_ref(), self.vote_repo.as_ref(), &poll).await?;
        Ok(VoteReceipt { vote_id: vote.id.map(|id| id.to_hex()).unwrap_or_default(), results })
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    async fn has_voted(&self, actor: &Actor, poll_id: &ObjectId) -> Result<HasVotedResponse, ServiceError> {
        self.load_poll(poll_id).await?;
        let has_voted = self.vote_repo.has_voted(&actor.id, poll_id).await?;
        Ok(HasVotedResponse { poll_id: poll_id.to_hex(), has_voted })
    }
}
