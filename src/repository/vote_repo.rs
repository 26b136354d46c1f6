use crate::model::vote::{OptionTally, Vote};
use crate::repository::mongo_handle::MongoHandle;
use crate::repository::repository_error::{bounded, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson};
use futures::stream::TryStreamExt;
use tracing::{error, info, instrument, warn};

#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Records a vote. A second vote for the same `(user_id, poll_id)` fails with `AlreadyExists`
    /// regardless of how many requests race; an option outside the poll fails with `NotFound`.
    async fn insert(&self, vote: Vote) -> RepositoryResult<Vote>;
    async fn has_voted(&self, user_id: &ObjectId, poll_id: &ObjectId) -> RepositoryResult<bool>;
    /// Per-option counts for one poll. Options without votes are omitted.
    async fn tally(&self, poll_id: &ObjectId) -> RepositoryResult<Vec<OptionTally>>;
    async fn list_by_user(&self, user_id: &ObjectId) -> RepositoryResult<Vec<Vote>>;
    async fn delete_by_poll(&self, poll_id: &ObjectId) -> RepositoryResult<u64>;
}

pub struct MongoVoteRepository {
    handle: MongoHandle,
}

impl MongoVoteRepository {
    pub fn new(handle: MongoHandle) -> Self {
        MongoVoteRepository { handle }
    }
}

#[async_trait]
impl VoteRepository for MongoVoteRepository {
    #[instrument(skip(self, vote), fields(user_id = %vote.user_id, poll_id = %vote.poll_id))]
    async fn insert(&self, mut vote: Vote) -> RepositoryResult<Vote> {
        vote.id = Some(ObjectId::new());
        bounded(self.handle.operation_timeout, "insert vote", async {
            let option = self
                .handle
                .options()
                .find_one(doc! { "_id": vote.option_id, "poll_id": vote.poll_id }, None)
                .await?;
            if option.is_none() {
                return Err(RepositoryError::not_found("Option does not belong to this poll"));
            }

            // Single-document insert: the unique (user_id, poll_id) index rejects a racing duplicate.
            match self.handle.votes().insert_one(vote.clone(), None).await {
                Ok(_) => {
                    info!("Vote recorded");
                    Ok(vote.clone())
                }
                Err(e) => {
                    let err = RepositoryError::from(e);
                    if matches!(err, RepositoryError::AlreadyExists(_)) {
                        warn!("Duplicate vote rejected by unique index");
                    } else {
                        error!("Vote insert failed: {err}");
                    }
                    Err(err)
                }
            }
        })
        .await
    }

    async fn has_voted(&self, user_id: &ObjectId, poll_id: &ObjectId) -> RepositoryResult<bool> {
        bounded(self.handle.operation_timeout, "check vote", async {
            let count = self
                .handle
                .votes()
                .count_documents(doc! { "user_id": user_id, "poll_id": poll_id }, None)
                .await?;
            Ok(count > 0)
        })
        .await
    }

    async fn tally(&self, poll_id: &ObjectId) -> RepositoryResult<Vec<OptionTally>> {
        let pipeline = vec![
            doc! { "$match": { "poll_id": poll_id } },
            doc! { "$group": { "_id": "$option_id", "count": { "$sum": 1 } } },
        ];
        bounded(self.handle.operation_timeout, "tally votes", async {
            let cursor = self.handle.votes().aggregate(pipeline, None).await?;
            let rows: Vec<bson::Document> = cursor.try_collect().await?;
            rows.into_iter()
                .map(|row| {
                    let option_id = row
                        .get_object_id("_id")
                        .map_err(|e| RepositoryError::serialization(format!("Bad tally row: {}", e)))?;
                    let count = match row.get("count") {
                        Some(Bson::Int32(n)) => *n as u64,
                        Some(Bson::Int64(n)) => *n as u64,
                        other => {
                            return Err(RepositoryError::serialization(format!("Bad tally count: {:?}", other)))
                        }
                    };
                    Ok(OptionTally { option_id, count })
                })
                .collect()
        })
        .await
    }

    async fn list_by_user(&self, user_id: &ObjectId) -> RepositoryResult<Vec<Vote>> {
        bounded(self.handle.operation_timeout, "list votes by user", async {
            let cursor = self.handle.votes().find(doc! { "user_id": user_id }, None).await?;
            let votes: Vec<Vote> = cursor.try_collect().await?;
            Ok(votes)
        })
        .await
    }

    #[instrument(skip(self), fields(poll_id = %poll_id))]
    async fn delete_by_poll(&self, poll_id: &ObjectId) -> RepositoryResult<u64> {
        bounded(self.handle.operation_timeout, "reset votes", async {
            let result = self.handle.votes().delete_many(doc! { "poll_id": poll_id }, None).await?;
            info!(deleted = result.deleted_count, "Votes deleted");
            Ok(result.deleted_count)
        })
        .await
    }
}
