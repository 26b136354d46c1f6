use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{info, instrument};
use validator::Validate;

use crate::dto::user_dto::{AdminResetPasswordRequest, CreateAccountRequest, UserView};
use crate::model::user::{Role, User};
use crate::repository::user_repo::UserRepository;
use crate::service::policy::{enforce, Actor, Operation};
use crate::service::user_service::{duplicate_email, hash_credential};
use crate::util::clock::Clock;
use crate::util::error::ServiceError;

/// Account administration. Every operation requires an admin actor.
#[async_trait]
pub trait AdminService: Send + Sync {
    async fn create_account(&self, actor: &Actor, request: CreateAccountRequest) -> Result<UserView, ServiceError>;
    async fn list_users(&self, actor: &Actor, role: Option<Role>) -> Result<Vec<UserView>, ServiceError>;
    async fn get_user(&self, actor: &Actor, user_id: &ObjectId) -> Result<UserView, ServiceError>;
    /// Deletes the account together with its votes and, for faculty, its polls.
    async fn delete_user(&self, actor: &Actor, target_id: &ObjectId) -> Result<(), ServiceError>;
    async fn change_role(&self, actor: &Actor, target_id: &ObjectId, new_role: Role) -> Result<UserView, ServiceError>;
    async fn reset_password(
        &self,
        actor: &Actor,
        target_id: &ObjectId,
        request: AdminResetPasswordRequest,
    ) -> Result<(), ServiceError>;
}

pub struct AdminServiceImpl {
    pub user_repo: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

impl AdminServiceImpl {
    pub fn new(user_repo: Arc<dyn UserRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { user_repo, clock }
    }

    async fn load_target(&self, target_id: &ObjectId) -> Result<User, ServiceError> {
        self.user_repo
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }
}

#[async_trait]
impl AdminService for AdminServiceImpl {
    #[instrument(skip(self, request), fields(actor = %actor.id, email = %request.email))]
    async fn create_account(&self, actor: &Actor, request: CreateAccountRequest) -> Result<UserView, ServiceError> {
        enforce(actor, Operation::ManageUsers)?;
        let request = CreateAccountRequest { email: request.email.trim().to_string(), ..request };
        request.validate()?;
        let role: Role = request.role.parse().map_err(ServiceError::InvalidInput)?;
        enforce(actor, Operation::CreateAccount { role })?;

        let mut user = User::new(request.email, hash_credential(&request.password)?, role, Some(actor.id));
        user.created_at = Some(self.clock.now());

        let created = self.user_repo.insert(user).await.map_err(duplicate_email)?;
        info!(user_id = ?created.id, role = %role, "Account created by admin");
        Ok(created.into())
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    async fn list_users(&self, actor: &Actor, role: Option<Role>) -> Result<Vec<UserView>, ServiceError> {
        enforce(actor, Operation::ManageUsers)?;
        let users = self.user_repo.list(role).await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    async fn get_user(&self, actor: &Actor, user_id: &ObjectId) -> Result<UserView, ServiceError> {
        enforce(actor, Operation::ManageUsers)?;
        Ok(self.load_target(user_id).await?.into())
    }

    #[instrument(skip(self), fields(actor = %actor.id, target = %target_id))]
    async fn delete_user(&self, actor: &Actor, target_id: &ObjectId) -> Result<(), ServiceError> {
        enforce(actor, Operation::ManageUsers)?;
        let target = self.load_target(target_id).await?;
        enforce(actor, Operation::DeleteUser { target_id: *target_id, target_role: target.role })?;

        self.user_repo.delete_cascade(target_id).await?;
        info!(role = %target.role, "User deleted with dependent records");
        Ok(())
    }

    #[instrument(skip(self), fields(actor = %actor.id, target = %target_id, new_role = %new_role))]
    async fn change_role(&self, actor: &Actor, target_id: &ObjectId, new_role: Role) -> Result<UserView, ServiceError> {
        enforce(actor, Operation::ManageUsers)?;
        let mut target = self.load_target(target_id).await?;
        enforce(
            actor,
            Operation::ChangeRole { target_id: *target_id, target_role: target.role, new_role },
        )?;

        self.user_repo.update_role(target_id, new_role).await?;
        info!(from = %target.role, "User role changed");
        target.role = new_role;
        Ok(target.into())
    }

    #[instrument(skip(self, request), fields(actor = %actor.id, target = %target_id))]
    async fn reset_password(
        &self,
        actor: &Actor,
        target_id: &ObjectId,
        request: AdminResetPasswordRequest,
    ) -> Result<(), ServiceError> {
        enforce(actor, Operation::ManageUsers)?;
        request.validate()?;
        self.load_target(target_id).await?;

        let hash = hash_credential(&request.new_password)?;
        self.user_repo.update_password(target_id, hash, self.clock.now()).await?;
        info!("Password reset by admin");
        Ok(())
    }
}
