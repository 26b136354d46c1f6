use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::dto::user_dto::{AuthResponse, ChangePasswordRequest, RegisterRequest, UserView};
use crate::model::user::{Role, User};
use crate::repository::repository_error::RepositoryError;
use crate::repository::user_repo::UserRepository;
use crate::service::policy::Actor;
use crate::util::clock::Clock;
use crate::util::error::ServiceError;
use crate::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl, TokenPair};
use crate::util::password::{PasswordStrength, PasswordUtils, PasswordUtilsImpl, MIN_PASSWORD_LENGTH};

const INVALID_LOGIN: &str = "Invalid email or password";

/// Hashes a credential, hiding hasher failures behind an internal error.
pub(crate) fn hash_credential(password: &str) -> Result<String, ServiceError> {
    PasswordUtilsImpl::hash_password(password)
        .map_err(|e| ServiceError::InternalError(format!("Password hash error: {}", e)))
}

pub(crate) fn duplicate_email(err: RepositoryError) -> ServiceError {
    match err {
        RepositoryError::AlreadyExists(_) => ServiceError::Conflict("Email already registered".to_string()),
        other => other.into(),
    }
}

/// Self-service identity operations: registration, login, tokens and own credentials.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn register_student(&self, request: RegisterRequest) -> Result<UserView, ServiceError>;
    async fn login(&self, email: String, password: String) -> Result<AuthResponse, ServiceError>;
    async fn refresh_token(&self, refresh_token: String) -> Result<TokenPair, ServiceError>;
    async fn profile(&self, actor: &Actor) -> Result<UserView, ServiceError>;
    async fn change_password(&self, actor: &Actor, request: ChangePasswordRequest) -> Result<(), ServiceError>;
    fn check_password_strength(&self, password: &str) -> PasswordStrength;
    /// Creates the first admin if no account uses `email` yet. Returns `None` when it already exists.
    async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<Option<UserView>, ServiceError>;
}

pub struct UserServiceImpl {
    pub user_repo: Arc<dyn UserRepository>,
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
    pub clock: Arc<dyn Clock>,
}

impl UserServiceImpl {
    pub fn new(user_repo: Arc<dyn UserRepository>, jwt_utils: Arc<JwtTokenUtilsImpl>, clock: Arc<dyn Clock>) -> Self {
        Self { user_repo, jwt_utils, clock }
    }

    fn issue_tokens(&self, user: &User) -> Result<TokenPair, ServiceError> {
        let id = user.id.map(|id| id.to_hex()).unwrap_or_default();
        self.jwt_utils
            .generate_token_pair(&id, &user.email, user.role)
            .map_err(|e| ServiceError::InternalError(format!("JWT error: {}", e)))
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn register_student(&self, request: RegisterRequest) -> Result<UserView, ServiceError> {
        // Length rules apply to the email as stored.
        let request = RegisterRequest { email: request.email.trim().to_string(), ..request };
        request.validate()?;
        info!("Registering new student");

        let hash = hash_credential(&request.password)?;
        let mut user = User::new(request.email, hash, Role::Student, None);
        user.created_at = Some(self.clock.now());

        let inserted = self.user_repo.insert(user).await.map_err(duplicate_email)?;
        info!(user_id = ?inserted.id, "Student registered");
        Ok(inserted.into())
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(&self, email: String, password: String) -> Result<AuthResponse, ServiceError> {
        info!("User login attempt");
        let user = match self.user_repo.find_by_email(email.trim()).await? {
            Some(user) => user,
            None => {
                warn!("Login rejected");
                return Err(ServiceError::Unauthorized(INVALID_LOGIN.to_string()));
            }
        };

        let valid = PasswordUtilsImpl::verify_password(&password, &user.password_hash).map_err(|e| {
            error!("Stored credential could not be verified: {}", e);
            ServiceError::InternalError(format!("Password verify error: {}", e))
        })?;
        if !valid {
            warn!("Login rejected");
            return Err(ServiceError::Unauthorized(INVALID_LOGIN.to_string()));
        }

        let tokens = self.issue_tokens(&user)?;
        info!(user_id = ?user.id, role = %user.role, "User logged in");
        Ok(AuthResponse { user: user.into(), tokens })
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh_token(&self, refresh_token: String) -> Result<TokenPair, ServiceError> {
        let claims = self
            .jwt_utils
            .validate_refresh_token(&refresh_token)
            .map_err(|e| ServiceError::Unauthorized(format!("Invalid refresh token: {}", e)))?;
        let user_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid refresh token subject".to_string()))?;

        // Re-read so the new pair carries the current role, and deleted users cannot refresh.
        let user = self
            .user_repo
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("User no longer exists".to_string()))?;

        info!(user_id = %user_id, "Refreshing token pair");
        self.issue_tokens(&user)
    }

    #[instrument(skip(self), fields(actor = %actor.id))]
    async fn profile(&self, actor: &Actor) -> Result<UserView, ServiceError> {
        self.user_repo
            .find_by_id(&actor.id)
            .await?
            .map(UserView::from)
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    #[instrument(skip(self, request), fields(actor = %actor.id))]
    async fn change_password(&self, actor: &Actor, request: ChangePasswordRequest) -> Result<(), ServiceError> {
        request.validate()?;
        if request.current_password == request.new_password {
            return Err(ServiceError::InvalidInput(
                "New password must be different from current password".to_string(),
            ));
        }

        let user = self
            .user_repo
            .find_by_id(&actor.id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let valid = PasswordUtilsImpl::verify_password(&request.current_password, &user.password_hash)
            .map_err(|e| ServiceError::InternalError(format!("Password verify error: {}", e)))?;
        if !valid {
            warn!("Password change rejected: current password mismatch");
            return Err(ServiceError::Unauthorized("Current password is incorrect".to_string()));
        }

        let hash = hash_credential(&request.new_password)?;
        self.user_repo.update_password(&actor.id, hash, self.clock.now()).await?;
        info!("Password changed");
        Ok(())
    }

    fn check_password_strength(&self, password: &str) -> PasswordStrength {
        PasswordUtilsImpl::check_strength(password)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<Option<UserView>, ServiceError> {
        if self.user_repo.find_by_email(email).await?.is_some() {
            info!("Admin user already exists, skipping creation");
            return Ok(None);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::InvalidInput(format!(
                "Admin password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let mut admin = User::new(email, hash_credential(password)?, Role::Admin, None);
        admin.created_at = Some(self.clock.now());

        match self.user_repo.insert(admin).await {
            Ok(created) => {
                info!(user_id = ?created.id, "Bootstrap admin created");
                Ok(Some(created.into()))
            }
            // Another instance won the race.
            Err(RepositoryError::AlreadyExists(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
