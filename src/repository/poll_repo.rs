use crate::model::bson_time;
use crate::model::poll::{Poll, PollOption};
use crate::repository::mongo_handle::{newest_first, MongoHandle};
use crate::repository::repository_error::{bounded, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use tracing::{error, info, instrument};

#[async_trait]
pub trait PollRepository: Send + Sync {
    /// Inserts the poll and all of its options, or nothing.
    async fn create_with_options(&self, poll: Poll, options: Vec<String>) -> RepositoryResult<(Poll, Vec<PollOption>)>;
    async fn get_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Poll>>;
    /// Newest first, optionally filtered by the active flag.
    async fn list(&self, is_active: Option<bool>) -> RepositoryResult<Vec<Poll>>;
    async fn list_by_creator(&self, creator: &ObjectId) -> RepositoryResult<Vec<Poll>>;
    async fn update(&self, id: &ObjectId, question: &str, is_active: bool) -> RepositoryResult<()>;
    async fn update_schedule(
        &self,
        id: &ObjectId,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> RepositoryResult<()>;
    /// Removes the poll with its options and votes in one unit.
    async fn delete_cascade(&self, id: &ObjectId) -> RepositoryResult<()>;

    async fn list_options(&self, poll_id: &ObjectId) -> RepositoryResult<Vec<PollOption>>;
    async fn get_option(&self, option_id: &ObjectId) -> RepositoryResult<Option<PollOption>>;
    async fn add_option(&self, poll_id: &ObjectId, text: &str) -> RepositoryResult<PollOption>;
    async fn update_option(&self, option_id: &ObjectId, text: &str) -> RepositoryResult<()>;
    /// Removes the option and the votes cast for it.
    async fn delete_option(&self, option_id: &ObjectId) -> RepositoryResult<()>;
}

pub struct MongoPollRepository {
    handle: MongoHandle,
}

impl MongoPollRepository {
    pub fn new(handle: MongoHandle) -> Self {
        MongoPollRepository { handle }
    }
}

#[async_trait]
impl PollRepository for MongoPollRepository {
    #[instrument(skip(self, poll, options), fields(question = %poll.question, options = options.len()))]
    async fn create_with_options(&self, mut poll: Poll, options: Vec<String>) -> RepositoryResult<(Poll, Vec<PollOption>)> {
        let poll_id = ObjectId::new();
        poll.id = Some(poll_id);
        let options: Vec<PollOption> = options
            .into_iter()
            .map(|text| PollOption { id: Some(ObjectId::new()), poll_id, text })
            .collect();

        bounded(self.handle.operation_timeout, "create poll", async {
            let mut session = self.handle.client.start_session(None).await?;
            session.start_transaction(None).await?;

            let outcome: RepositoryResult<()> = async {
                self.handle.polls().insert_one_with_session(poll.clone(), None, &mut session).await?;
                self.handle
                    .options()
                    .insert_many_with_session(options.clone(), None, &mut session)
                    .await?;
                Ok(())
            }
            .await;

            match outcome {
                Ok(()) => {
                    session.commit_transaction().await?;
                    info!(poll_id = %poll_id, "Poll created");
                    Ok((poll.clone(), options.clone()))
                }
                Err(e) => {
                    error!("Poll creation rolled back: {e}");
                    let _ = session.abort_transaction().await;
                    Err(e)
                }
            }
        })
        .await
    }

    async fn get_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Poll>> {
        bounded(self.handle.operation_timeout, "get poll", async {
            Ok(self.handle.polls().find_one(doc! { "_id": id }, None).await?)
        })
        .await
    }

    async fn list(&self, is_active: Option<bool>) -> RepositoryResult<Vec<Poll>> {
        let filter = is_active.map(|active| doc! { "is_active": active });
        bounded(self.handle.operation_timeout, "list polls", async {
            let cursor = self.handle.polls().find(filter, newest_first()).await?;
            let polls: Vec<Poll> = cursor.try_collect().await?;
            Ok(polls)
        })
        .await
    }

    async fn list_by_creator(&self, creator: &ObjectId) -> RepositoryResult<Vec<Poll>> {
        bounded(self.handle.operation_timeout, "list polls by creator", async {
            let cursor = self.handle.polls().find(doc! { "created_by": creator }, newest_first()).await?;
            let polls: Vec<Poll> = cursor.try_collect().await?;
            Ok(polls)
        })
        .await
    }

    #[instrument(skip(self, question), fields(id = %id, is_active = is_active))]
    async fn update(&self, id: &ObjectId, question: &str, is_active: bool) -> RepositoryResult<()> {
        bounded(self.handle.operation_timeout, "update poll", async {
            let result = self
                .handle
                .polls()
                .update_one(
                    doc! { "_id": id },
                    doc! { "$set": { "question": question, "is_active": is_active } },
                    None,
                )
                .await?;
            if result.matched_count == 0 {
                return Err(RepositoryError::not_found(format!("No poll found for ID: {}", id)));
            }
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn update_schedule(
        &self,
        id: &ObjectId,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> RepositoryResult<()> {
        let start_time = bson_time::to_bson(start_time);
        let end_time = bson_time::to_bson(end_time);
        bounded(self.handle.operation_timeout, "reschedule poll", async {
            let result = self
                .handle
                .polls()
                .update_one(
                    doc! { "_id": id },
                    doc! { "$set": { "start_time": start_time, "end_time": end_time } },
                    None,
                )
                .await?;
            if result.matched_count == 0 {
                return Err(RepositoryError::not_found(format!("No poll found for ID: {}", id)));
            }
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_cascade(&self, id: &ObjectId) -> RepositoryResult<()> {
        bounded(self.handle.operation_timeout, "delete poll", async {
            let mut session = self.handle.client.start_session(None).await?;
            session.start_transaction(None).await?;

            let outcome: RepositoryResult<()> = async {
                self.handle
                    .votes()
                    .delete_many_with_session(doc! { "poll_id": id }, None, &mut session)
                    .await?;
                self.handle
                    .options()
                    .delete_many_with_session(doc! { "poll_id": id }, None, &mut session)
                    .await?;
                let deleted = self
                    .handle
                    .polls()
                    .delete_one_with_session(doc! { "_id": id }, None, &mut session)
                    .await?;
                if deleted.deleted_count == 0 {
                    return Err(RepositoryError::not_found(format!("No poll found for ID: {}", id)));
                }
                Ok(())
            }
            .await;

            match outcome {
                Ok(()) => {
                    session.commit_transaction().await?;
                    info!("Poll and dependent records deleted");
                    Ok(())
                }
                Err(e) => {
                    error!("Poll delete rolled back: {e}");
                    let _ = session.abort_transaction().await;
                    Err(e)
                }
            }
        })
        .await
    }

    async fn list_options(&self, poll_id: &ObjectId) -> RepositoryResult<Vec<PollOption>> {
        bounded(self.handle.operation_timeout, "list poll options", async {
            let cursor = self.handle.options().find(doc! { "poll_id": poll_id }, None).await?;
            let options: Vec<PollOption> = cursor.try_collect().await?;
            Ok(options)
        })
        .await
    }

    async fn get_option(&self, option_id: &ObjectId) -> RepositoryResult<Option<PollOption>> {
        bounded(self.handle.operation_timeout, "get poll option", async {
            Ok(self.handle.options().find_one(doc! { "_id": option_id }, None).await?)
        })
        .await
    }

    #[instrument(skip(self, text), fields(poll_id = %poll_id))]
    async fn add_option(&self, poll_id: &ObjectId, text: &str) -> RepositoryResult<PollOption> {
        let option = PollOption { id: Some(ObjectId::new()), poll_id: *poll_id, text: text.to_string() };
        bounded(self.handle.operation_timeout, "add poll option", async {
            self.handle.options().insert_one(option.clone(), None).await?;
            Ok(option)
        })
        .await
    }

    #[instrument(skip(self, text), fields(option_id = %option_id))]
    async fn update_option(&self, option_id: &ObjectId, text: &str) -> RepositoryResult<()> {
        bounded(self.handle.operation_timeout, "update poll option", async {
            let result = self
                .handle
                .options()
                .update_one(doc! { "_id": option_id }, doc! { "$set": { "text": text } }, None)
                .await?;
            if result.matched_count == 0 {
                return Err(RepositoryError::not_found(format!("No option found for ID: {}", option_id)));
            }
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(option_id = %option_id))]
    async fn delete_option(&self, option_id: &ObjectId) -> RepositoryResult<()> {
        bounded(self.handle.operation_timeout, "delete poll option", async {
            let mut session = self.handle.client.start_session(None).await?;
            session.start_transaction(None).await?;

            let outcome: RepositoryResult<()> = async {
                self.handle
                    .votes()
                    .delete_many_with_session(doc! { "option_id": option_id }, None, &mut session)
                    .await?;
                let deleted = self
                    .handle
                    .options()
                    .delete_one_with_session(doc! { "_id": option_id }, None, &mut session)
                    .await?;
                if deleted.deleted_count == 0 {
                    return Err(RepositoryError::not_found(format!("No option found for ID: {}", option_id)));
                }
                Ok(())
            }
            .await;

            match outcome {
                Ok(()) => {
                    session.commit_transaction().await?;
                    Ok(())
                }
                Err(e) => {
                    let _ = session.abort_transaction().await;
                    Err(e)
                }
            }
        })
        .await
    }
}
