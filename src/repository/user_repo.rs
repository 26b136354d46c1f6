use crate::model::bson_time;
use crate::model::user::{Role, User};
use crate::repository::mongo_handle::{newest_first, MongoHandle};
use crate::repository::repository_error::{bounded, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use tracing::{error, info, instrument};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user. Fails with `AlreadyExists` when the email is taken.
    async fn insert(&self, user: User) -> RepositoryResult<User>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>>;
    /// Newest first.
    async fn list(&self, role: Option<Role>) -> RepositoryResult<Vec<User>>;
    async fn update_role(&self, id: &ObjectId, role: Role) -> RepositoryResult<()>;
    async fn update_password(&self, id: &ObjectId, password_hash: String, changed_at: DateTime<Utc>) -> RepositoryResult<()>;
    /// Removes the user, their votes, and every poll they own (with options and votes) in one unit.
    async fn delete_cascade(&self, id: &ObjectId) -> RepositoryResult<()>;
}

pub struct MongoUserRepository {
    handle: MongoHandle,
}

impl MongoUserRepository {
    pub fn new(handle: MongoHandle) -> Self {
        MongoUserRepository { handle }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[instrument(skip(self, user), fields(email = %user.email, role = %user.role))]
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        user.id = Some(ObjectId::new());
        bounded(self.handle.operation_timeout, "insert user", async {
            self.handle.users().insert_one(user.clone(), None).await?;
            info!("User inserted");
            Ok(user)
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        bounded(self.handle.operation_timeout, "find user by email", async {
            let user = self.handle.users().find_one(doc! { "email": email }, None).await?;
            Ok(user)
        })
        .await
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        bounded(self.handle.operation_timeout, "find user by id", async {
            let user = self.handle.users().find_one(doc! { "_id": id }, None).await?;
            Ok(user)
        })
        .await
    }

    async fn list(&self, role: Option<Role>) -> RepositoryResult<Vec<User>> {
        let filter = role.map(|r| doc! { "role": r.as_str() });
        bounded(self.handle.operation_timeout, "list users", async {
            let cursor = self.handle.users().find(filter, newest_first()).await?;
            let users: Vec<User> = cursor.try_collect().await?;
            Ok(users)
        })
        .await
    }

    #[instrument(skip(self), fields(id = %id, role = %role))]
    async fn update_role(&self, id: &ObjectId, role: Role) -> RepositoryResult<()> {
        bounded(self.handle.operation_timeout, "update user role", async {
            let result = self
                .handle
                .users()
                .update_one(doc! { "_id": id }, doc! { "$set": { "role": role.as_str() } }, None)
                .await?;
            if result.matched_count == 0 {
                error!("No user found to update role");
                return Err(RepositoryError::not_found(format!("No user found for ID: {}", id)));
            }
            Ok(())
        })
        .await
    }

    #[instrument(skip(self, password_hash), fields(id = %id))]
    async fn update_password(&self, id: &ObjectId, password_hash: String, changed_at: DateTime<Utc>) -> RepositoryResult<()> {
        let changed_at = bson_time::to_bson(Some(changed_at));
        bounded(self.handle.operation_timeout, "update user password", async {
            let result = self
                .handle
                .users()
                .update_one(
                    doc! { "_id": id },
                    doc! { "$set": { "password_hash": password_hash, "password_changed_at": changed_at } },
                    None,
                )
                .await?;
            if result.matched_count == 0 {
                return Err(RepositoryError::not_found(format!("No user found for ID: {}", id)));
            }
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_cascade(&self, id: &ObjectId) -> RepositoryResult<()> {
        bounded(self.handle.operation_timeout, "delete user", async {
            let mut session = self.handle.client.start_session(None).await?;
            session.start_transaction(None).await?;

            let outcome: RepositoryResult<()> = async {
                let owned_polls = self
                    .handle
                    .polls()
                    .distinct_with_session("_id", doc! { "created_by": id }, None, &mut session)
                    .await?;
                self.handle
                    .votes()
                    .delete_many_with_session(
                        doc! { "$or": [ { "user_id": id }, { "poll_id": { "$in": owned_polls.clone() } } ] },
                        None,
                        &mut session,
                    )
                    .await?;
                self.handle
                    .options()
                    .delete_many_with_session(doc! { "poll_id": { "$in": owned_polls } }, None, &mut session)
                    .await?;
                self.handle
                    .polls()
                    .delete_many_with_session(doc! { "created_by": id }, None, &mut session)
                    .await?;
                let deleted = self
                    .handle
                    .users()
                    .delete_one_with_session(doc! { "_id": id }, None, &mut session)
                    .await?;
                if deleted.deleted_count == 0 {
                    return Err(RepositoryError::not_found(format!("No user found for ID: {}", id)));
                }
                Ok(())
            }
            .await;

            match outcome {
                Ok(()) => {
                    session.commit_transaction().await?;
                    info!("User and dependent records deleted");
                    Ok(())
                }
                Err(e) => {
                    error!("User delete rolled back: {e}");
                    let _ = session.abort_transaction().await;
                    Err(e)
                }
            }
        })
        .await
    }
}
