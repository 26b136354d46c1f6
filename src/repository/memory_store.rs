//! Process-local storage backend.
//!
//! One mutex guards every relation, so each trait method is a single atomic unit and
//! the unique constraints (user email, one vote per user and poll) hold under any
//! interleaving of concurrent requests. Foreign keys are checked on insert and
//! deletes cascade the same way the MongoDB transactions do.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::poll::{Poll, PollOption};
use crate::model::user::{Role, User};
use crate::model::vote::{OptionTally, Vote};
use crate::repository::poll_repo::PollRepository;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::repository::user_repo::UserRepository;
use crate::repository::vote_repo::VoteRepository;

#[derive(Default)]
struct State {
    users: HashMap<ObjectId, User>,
    polls: HashMap<ObjectId, Poll>,
    options: HashMap<ObjectId, PollOption>,
    votes: HashMap<ObjectId, Vote>,
}

impl State {
    fn remove_poll(&mut self, poll_id: &ObjectId) {
        self.votes.retain(|_, v| v.poll_id != *poll_id);
        self.options.retain(|_, o| o.poll_id != *poll_id);
        self.polls.remove(poll_id);
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> RepositoryResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::database("In-memory store lock poisoned"))
    }
}

/// Sorts by creation time, newest first. Ids break ties between records stamped in the same instant.
fn newest_first<T, F>(mut items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (Option<DateTime<Utc>>, Option<ObjectId>),
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        let mut state = self.state()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::already_exists(format!("Duplicate key: email {}", user.email)));
        }
        let id = ObjectId::new();
        user.id = Some(id);
        state.users.insert(id, user.clone());
        debug!(user_id = %id, "User stored in memory");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let state = self.state()?;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        let state = self.state()?;
        Ok(state.users.get(id).cloned())
    }

    async fn list(&self, role: Option<Role>) -> RepositoryResult<Vec<User>> {
        let state = self.state()?;
        let users = state
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        Ok(newest_first(users, |u: &User| (u.created_at, u.id)))
    }

    async fn update_role(&self, id: &ObjectId, role: Role) -> RepositoryResult<()> {
        let mut state = self.state()?;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found(format!("No user found for ID: {}", id)))?;
        user.role = role;
        Ok(())
    }

    async fn update_password(&self, id: &ObjectId, password_hash: String, changed_at: DateTime<Utc>) -> RepositoryResult<()> {
        let mut state = self.state()?;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found(format!("No user found for ID: {}", id)))?;
        user.password_hash = password_hash;
        user.password_changed_at = Some(changed_at);
        Ok(())
    }

    async fn delete_cascade(&self, id: &ObjectId) -> RepositoryResult<()> {
        let mut state = self.state()?;
        if !state.users.contains_key(id) {
            return Err(RepositoryError::not_found(format!("No user found for ID: {}", id)));
        }
        let owned: Vec<ObjectId> = state
            .polls
            .values()
            .filter(|p| p.created_by == *id)
            .filter_map(|p| p.id)
            .collect();
        for poll_id in &owned {
            state.remove_poll(poll_id);
        }
        state.votes.retain(|_, v| v.user_id != *id);
        state.users.remove(id);
        Ok(())
    }
}

#[async_trait]
impl PollRepository for InMemoryStore {
    async fn create_with_options(&self, mut poll: Poll, options: Vec<String>) -> RepositoryResult<(Poll, Vec<PollOption>)> {
        let mut state = self.state()?;
        if !state.users.contains_key(&poll.created_by) {
            return Err(RepositoryError::validation("Poll creator does not exist"));
        }
        let poll_id = ObjectId::new();
        poll.id = Some(poll_id);
        let options: Vec<PollOption> = options
            .into_iter()
            .map(|text| PollOption { id: Some(ObjectId::new()), poll_id, text })
            .collect();
        state.polls.insert(poll_id, poll.clone());
        for option in &options {
            if let Some(option_id) = option.id {
                state.options.insert(option_id, option.clone());
            }
        }
        Ok((poll, options))
    }

    async fn get_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Poll>> {
        let state = self.state()?;
        Ok(state.polls.get(id).cloned())
    }

    async fn list(&self, is_active: Option<bool>) -> RepositoryResult<Vec<Poll>> {
        let state = self.state()?;
        let polls = state
            .polls
            .values()
            .filter(|p| is_active.map_or(true, |active| p.is_active == active))
            .cloned()
            .collect();
        Ok(newest_first(polls, |p: &Poll| (p.created_at, p.id)))
    }

    async fn list_by_creator(&self, creator: &ObjectId) -> RepositoryResult<Vec<Poll>> {
        let state = self.state()?;
        let polls = state.polls.values().filter(|p| p.created_by == *creator).cloned().collect();
        Ok(newest_first(polls, |p: &Poll| (p.created_at, p.id)))
    }

    async fn update(&self, id: &ObjectId, question: &str, is_active: bool) -> RepositoryResult<()> {
        let mut state = self.state()?;
        let poll = state
            .polls
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found(format!("No poll found for ID: {}", id)))?;
        poll.question = question.to_string();
        poll.is_active = is_active;
        Ok(())
    }

    async fn update_schedule(
        &self,
        id: &ObjectId,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> RepositoryResult<()> {
        let mut state = self.state()?;
        let poll = state
            .polls
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found(format!("No poll found for ID: {}", id)))?;
        poll.start_time = start_time;
        poll.end_time = end_time;
        Ok(())
    }

    async fn delete_cascade(&self, id: &ObjectId) -> RepositoryResult<()> {
        let mut state = self.state()?;
        if !state.polls.contains_key(id) {
            return Err(RepositoryError::not_found(format!("No poll found for ID: {}", id)));
        }
        state.remove_poll(id);
        Ok(())
    }

    async fn list_options(&self, poll_id: &ObjectId) -> RepositoryResult<Vec<PollOption>> {
        let state = self.state()?;
        let mut options: Vec<PollOption> = state.options.values().filter(|o| o.poll_id == *poll_id).cloned().collect();
        // ObjectIds grow with creation time, which keeps options in the order they were added
        options.sort_by_key(|o| o.id);
        Ok(options)
    }

    async fn get_option(&self, option_id: &ObjectId) -> RepositoryResult<Option<PollOption>> {
        let state = self.state()?;
        Ok(state.options.get(option_id).cloned())
    }

    async fn add_option(&self, poll_id: &ObjectId, text: &str) -> RepositoryResult<PollOption> {
        let mut state = self.state()?;
        if !state.polls.contains_key(poll_id) {
            return Err(RepositoryError::not_found(format!("No poll found for ID: {}", poll_id)));
        }
        let id = ObjectId::new();
        let option = PollOption { id: Some(id), poll_id: *poll_id, text: text.to_string() };
        state.options.insert(id, option.clone());
        Ok(option)
    }

    async fn update_option(&self, option_id: &ObjectId, text: &str) -> RepositoryResult<()> {
        let mut state = self.state()?;
        let option = state
            .options
            .get_mut(option_id)
            .ok_or_else(|| RepositoryError::not_found(format!("No option found for ID: {}", option_id)))?;
        option.text = text.to_string();
        Ok(())
    }

    async fn delete_option(&self, option_id: &ObjectId) -> RepositoryResult<()> {
        let mut state = self.state()?;
        if state.options.remove(option_id).is_none() {
            return Err(RepositoryError::not_found(format!("No option found for ID: {}", option_id)));
        }
        state.votes.retain(|_, v| v.option_id != *option_id);
        Ok(())
    }
}

#[async_trait]
impl VoteRepository for InMemoryStore {
    async fn insert(&self, mut vote: Vote) -> RepositoryResult<Vote> {
        let mut state = self.state()?;
        if !state.users.contains_key(&vote.user_id) {
            return Err(RepositoryError::not_found(format!("No user found for ID: {}", vote.user_id)));
        }
        if !state.polls.contains_key(&vote.poll_id) {
            return Err(RepositoryError::not_found(format!("No poll found for ID: {}", vote.poll_id)));
        }
        match state.options.get(&vote.option_id) {
            Some(option) if option.poll_id == vote.poll_id => {}
            _ => return Err(RepositoryError::not_found("Option does not belong to this poll")),
        }
        if state
            .votes
            .values()
            .any(|v| v.user_id == vote.user_id && v.poll_id == vote.poll_id)
        {
            return Err(RepositoryError::already_exists(format!(
                "Duplicate key: vote for user {} on poll {}",
                vote.user_id, vote.poll_id
            )));
        }
        let id = ObjectId::new();
        vote.id = Some(id);
        state.votes.insert(id, vote.clone());
        Ok(vote)
    }

    async fn has_voted(&self, user_id: &ObjectId, poll_id: &ObjectId) -> RepositoryResult<bool> {
        let state = self.state()?;
        Ok(state
            .votes
            .values()
            .any(|v| v.user_id == *user_id && v.poll_id == *poll_id))
    }

    async fn tally(&self, poll_id: &ObjectId) -> RepositoryResult<Vec<OptionTally>> {
        let state = self.state()?;
        let mut counts: HashMap<ObjectId, u64> = HashMap::new();
        for vote in state.votes.values().filter(|v| v.poll_id == *poll_id) {
            *counts.entry(vote.option_id).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(option_id, count)| OptionTally { option_id, count })
            .collect())
    }

    async fn list_by_user(&self, user_id: &ObjectId) -> RepositoryResult<Vec<Vote>> {
        let state = self.state()?;
        Ok(state.votes.values().filter(|v| v.user_id == *user_id).cloned().collect())
    }

    async fn delete_by_poll(&self, poll_id: &ObjectId) -> RepositoryResult<u64> {
        let mut state = self.state()?;
        let before = state.votes.len();
        state.votes.retain(|_, v| v.poll_id != *poll_id);
        Ok((before - state.votes.len()) as u64)
    }
}
