use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{debug, info, instrument};
use validator::Validate;

use crate::dto::poll_dto::{
    CreatePollRequest, OptionRequest, OptionView, PollDetails, PollView, PollWithResults, ResetVotesResponse,
    ScheduleRequest, UpdatePollRequest, VotablePoll,
};
use crate::model::poll::{Poll, PollOption};
use crate::repository::poll_repo::PollRepository;
use crate::repository::vote_repo::VoteRepository;
use crate::service::lifecycle::{self, validate_schedule};
use crate::service::policy::{enforce, Actor, Operation};
use crate::service::results::{self, PollResults};
use crate::util::clock::Clock;
use crate::util::error::ServiceError;

#[async_trait]
pub trait PollService: Send + Sync {
    async fn create_poll(&self, actor: &Actor, request: CreatePollRequest) -> Result<PollDetails, ServiceError>;
    async fn get_poll(&self, actor: &Actor, poll_id: &ObjectId) -> Result<PollDetails, ServiceError>;
    async fn update_poll(&self, actor: &Actor, poll_id: &ObjectId, request: UpdatePollRequest)
        -> Result<PollView, ServiceError>;
    async fn reschedule_poll(&self, actor: &Actor, poll_id: &ObjectId, request: ScheduleRequest)
        -> Result<PollView, ServiceError>;
    async fn delete_poll(&self, actor: &Actor, poll_id: &ObjectId) -> Result<(), ServiceError>;

    async fn add_option(&self, actor: &Actor, poll_id: &ObjectId, request: OptionRequest)
        -> Result<OptionView, ServiceError>;
    async fn update_option(&self, actor: &Actor, option_id: &ObjectId, request: OptionRequest)
        -> Result<OptionView, ServiceError>;
    async fn delete_option(&self, actor: &Actor, option_id: &ObjectId) -> Result<(), ServiceError>;
    async fn reset_votes(&self, actor: &Actor, poll_id: &ObjectId) -> Result<ResetVotesResponse, ServiceError>;

    async fn get_results(&self, actor: &Actor, poll_id: &ObjectId) -> Result<PollResults, ServiceError>;
    async fn list_all_with_results(&self, actor: &Actor) -> Result<Vec<PollWithResults>, ServiceError>;
    async fn list_own_with_results(&self, actor: &Actor) -> Result<Vec<PollWithResults>, ServiceError>;
    /// Polls open for voting right now, each with its options and whether `actor` already voted.
    async fn list_votable_polls(&self, actor: &Actor) -> Result<Vec<VotablePoll>, ServiceError>;
}

pub struct PollServiceImpl {
    pub poll_repo: Arc<dyn PollRepository>,
    pub vote_repo: Arc<dyn VoteRepository>,
    pub clock: Arc<dyn Clock>,
}

fn required_text(value: &str, what: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput(format!("{} cannot be empty", what)));
    }
    Ok(trimmed.to_string())
}

impl PollServiceImpl {
    pub fn new(poll_repo: Arc<dyn PollRepository>, vote_repo: Arc<dyn VoteRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { poll_repo, vote_repo, clock }
    }

    async fn load_poll(&self, poll_id: &ObjectId) -> Result<Poll, ServiceError> {
        self.poll_repo
            .get_by_id(poll_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Poll not found".to_string()))
    }

    async fn load_option(&self, option_id: &ObjectId) -> Result<PollOption, ServiceError> {
        self.poll_repo
            .get_option(option_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Option not found".to_string()))
    }

    /// Loads the poll and checks that `actor` owns it.
    async fn owned_poll(&self, actor: &Actor, poll_id: &ObjectId) -> Result<Poll, ServiceError> {
        let poll = self.load_poll(poll_id).await?;
        enforce(actor, Operation::ModifyPoll { owner: poll.created_by })?;
        Ok(poll)
    }

    async fn with_results(&self, polls: Vec<Poll>) -> Result<Vec<PollWithResults>, ServiceError> {
        let now = self.clock.now();
        let mut out = Vec::with_capacity(polls.len());
        for poll in polls {
            let results = results::load(self.poll_repo.as_ref(), self.vote_repo.as_ref(), &poll).await?;
            out.push(PollWithResults { poll: PollView::at(&poll, now), results });
        }
        Ok(out)
    }
}

#[async_trait]
impl PollService for PollServiceImpl {
    #[instrument(skip(self, request), fields(actor = %actor.id))]
    async fn create_poll(&self, actor: &Actor, request: CreatePollRequest) -> Result<PollDetails, ServiceError> {
        enforce(actor, Operation::CreatePoll)?;
        request.validate()?;

        let question = required_text(&request.question, "Question")?;
        let options = request
            .options
            .iter()
            .map(|text| required_text(text, "Option text"))
            .collect::<Result<Vec<_>, _>>()?;
        validate_schedule(request.start_time, request.end_time)?;

        let now = self.clock.now();
        let mut poll = Poll::new(question, actor.id, request.start_time, request.end_time);
        poll.created_at = Some(now);

        let (poll, options) = self.poll_repo.create_with_options(poll, options).await?;
        info!(poll_id = ?poll.id, options = options.len(), "Poll created");
        Ok(PollDetails {
            poll: PollView::at(&poll, now),
            options: options.into_iter().map(OptionView::from).collect(),
        })
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    async fn get_poll(&self, actor: &Actor, poll_id: &ObjectId) -> Result<PollDetails, ServiceError> {
        let poll = self.load_poll(poll_id).await?;
        let now = self.clock.now();
        enforce(
            actor,
            Operation::ViewPoll { owner: poll.created_by, votable: lifecycle::is_votable(&poll, now) },
        )?;

        let options = self.poll_repo.list_options(poll_id).await?;
        Ok(PollDetails {
            poll: PollView::at(&poll, now),
            options: options.into_iter().map(OptionView::from).collect(),
        })
    }

    #[instrument(skip(self, request), fields(actor = %actor.id))]
    async fn update_poll(
        &self,
        actor: &Actor,
        poll_id: &ObjectId,
        request: UpdatePollRequest,
    ) -> Result<PollView, ServiceError> {
        let mut poll = self.owned_poll(actor, poll_id).await?;
        request.validate()?;
        let question = required_text(&request.question, "Question")?;

        self.poll_repo.update(poll_id, &question, request.is_active).await?;
        info!(is_active = request.is_active, "Poll updated");
        poll.question = question;
        poll.is_active = request.is_active;
        Ok(PollView::at(&poll, self.clock.now()))
    }

    #[instrument(skip(self, request), fields(actor = %actor.id))]
    async fn reschedule_poll(
        &self,
        actor: &Actor,
        poll_id: &ObjectId,
        request: ScheduleRequest,
    ) -> Result<PollView, ServiceError> {
        let mut poll = self.owned_poll(actor, poll_id).await?;
        validate_schedule(request.start_time, request.end_time)?;

        self.poll_repo.update_schedule(poll_id, request.start_time, request.end_time).await?;
        info!(start = ?request.start_time, end = ?request.end_time, "Poll rescheduled");
        poll.start_time = request.start_time;
        poll.end_time = request.end_time;
        Ok(PollView::at(&poll, self.clock.now()))
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    async fn delete_poll(&self, actor: &Actor, poll_id: &ObjectId) -> Result<(), ServiceError> {
        self.owned_poll(actor, poll_id).await?;
        self.poll_repo.delete_cascade(poll_id).await?;
        info!("Poll deleted with its options and votes");
        Ok(())
    }

    #[instrument(skip(self, request), fields(actor = %actor.id))]
    async fn add_option(
        &self,
        actor: &Actor,
        poll_id: &ObjectId,
        request: OptionRequest,
    ) -> Result<OptionView, ServiceError> {
        self.owned_poll(actor, poll_id).await?;
        request.validate()?;
        let text = required_text(&request.text, "Option text")?;

        let option = self.poll_repo.add_option(poll_id, &text).await?;
        info!(option_id = ?option.id, "Option added");
        Ok(option.into())
    }

    #[instrument(skip(self, request), fields(actor = %actor.id))]
    async fn update_option(
        &self,
        actor: &Actor,
        option_id: &ObjectId,
        request: OptionRequest,
    ) -> Result<OptionView, ServiceError> {
        let mut option = self.load_option(option_id).await?;
        self.owned_poll(actor, &option.poll_id).await?;
        request.validate()?;
        let text = required_text(&request.text, "Option text")?;

        self.poll_repo.update_option(option_id, &text).await?;
        option.text = text;
        Ok(option.into())
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    async fn delete_option(&self, actor: &Actor, option_id: &ObjectId) -> Result<(), ServiceError> {
        let option = self.load_option(option_id).await?;
        self.owned_poll(actor, &option.poll_id).await?;

        // No floor on the remaining option count once a poll exists.
        self.poll_repo.delete_option(option_id).await?;
        info!(poll_id = %option.poll_id, "Option deleted with its votes");
        Ok(())
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    async fn reset_votes(&self, actor: &Actor, poll_id: &ObjectId) -> Result<ResetVotesResponse, ServiceError> {
        self.owned_poll(actor, poll_id).await?;
        let deleted_votes = self.vote_repo.delete_by_poll(poll_id).await?;
        info!(deleted_votes, "Poll votes reset");
        Ok(ResetVotesResponse { poll_id: poll_id.to_hex(), deleted_votes })
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    async fn get_results(&self, actor: &Actor, poll_id: &ObjectId) -> Result<PollResults, ServiceError> {
        let poll = self.load_poll(poll_id).await?;
        enforce(actor, Operation::ViewResults { owner: poll.created_by })?;
        results::load(self.poll_repo.as_ref(), self.vote_repo.as_ref(), &poll).await
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    async fn list_all_with_results(&self, actor: &Actor) -> Result<Vec<PollWithResults>, ServiceError> {
        enforce(actor, Operation::ViewAllPolls)?;
        let polls = self.poll_repo.list(None).await?;
        debug!(count = polls.len(), "Listing all polls");
        self.with_results(polls).await
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    async fn list_own_with_results(&self, actor: &Actor) -> Result<Vec<PollWithResults>, ServiceError> {
        enforce(actor, Operation::ViewOwnPolls)?;
        let polls = self.poll_repo.list_by_creator(&actor.id).await?;
        self.with_results(polls).await
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    async fn list_votable_polls(&self, actor: &Actor) -> Result<Vec<VotablePoll>, ServiceError> {
        enforce(actor, Operation::ListVotablePolls)?;

        // Evaluated per request; votability depends on the clock alone.
        let now = self.clock.now();
        let candidates = self.poll_repo.list(Some(true)).await?;

        let mut out = Vec::new();
        for poll in candidates.into_iter().filter(|p| lifecycle::is_votable(p, now)) {
            let Some(poll_id) = poll.id else { continue };
            let options = self.poll_repo.list_options(&poll_id).await?;
            let has_voted = self.vote_repo.has_voted(&actor.id, &poll_id).await?;
            out.push(VotablePoll {
                poll: PollView::at(&poll, now),
                options: options.into_iter().map(OptionView::from).collect(),
                has_voted,
            });
        }
        debug!(count = out.len(), "Votable polls listed");
        Ok(out)
    }
}
