use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::admin_user_conf::AdminUserConfig;
use crate::config::app_conf::{AppConfig, StorageBackend};
use crate::config::mongo_conf::MongoConfig;
use crate::config::{ConfigError, JwtConfig};
use crate::middlewares::auth_middleware::AuthState;
use crate::repository::memory_store::InMemoryStore;
use crate::repository::mongo_handle::MongoHandle;
use crate::repository::poll_repo::{MongoPollRepository, PollRepository};
use crate::repository::repository_error::RepositoryError;
use crate::repository::user_repo::{MongoUserRepository, UserRepository};
use crate::repository::vote_repo::{MongoVoteRepository, VoteRepository};
use crate::router::admin_router::admin_router;
use crate::router::auth_router::auth_router;
use crate::router::password_router::password_router;
use crate::router::poll_router::poll_router;
use crate::router::vote_router::vote_router;
use crate::service::admin_service::{AdminService, AdminServiceImpl};
use crate::service::poll_service::{PollService, PollServiceImpl};
use crate::service::user_service::{UserService, UserServiceImpl};
use crate::service::vote_service::{VoteService, VoteServiceImpl};
use crate::util::clock::{Clock, SystemClock};
use crate::util::jwt::JwtTokenUtilsImpl;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid listen address: {0}")]
    Address(String),
}

/// The three repositories, backed by one store.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub polls: Arc<dyn PollRepository>,
    pub votes: Arc<dyn VoteRepository>,
}

impl Storage {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Storage { users: store.clone(), polls: store.clone(), votes: store }
    }

    pub async fn mongo(config: &MongoConfig) -> Result<Self, AppError> {
        let handle = MongoHandle::connect(config).await?;
        handle.ensure_indexes().await?;
        Ok(Storage {
            users: Arc::new(MongoUserRepository::new(handle.clone())),
            polls: Arc::new(MongoPollRepository::new(handle.clone())),
            votes: Arc::new(MongoVoteRepository::new(handle)),
        })
    }
}

/// Services and the middleware state, wired over one storage backend and one clock.
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserService>,
    pub admin_service: Arc<dyn AdminService>,
    pub poll_service: Arc<dyn PollService>,
    pub vote_service: Arc<dyn VoteService>,
    pub auth_state: Arc<AuthState>,
}

impl AppState {
    pub fn new(storage: Storage, jwt_config: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let jwt_utils = Arc::new(JwtTokenUtilsImpl::new(jwt_config));
        AppState {
            user_service: Arc::new(UserServiceImpl::new(storage.users.clone(), jwt_utils.clone(), clock.clone())),
            admin_service: Arc::new(AdminServiceImpl::new(storage.users.clone(), clock.clone())),
            poll_service: Arc::new(PollServiceImpl::new(storage.polls.clone(), storage.votes.clone(), clock.clone())),
            vote_service: Arc::new(VoteServiceImpl::new(storage.polls, storage.votes, clock)),
            auth_state: Arc::new(AuthState { jwt_utils, user_repo: storage.users }),
        }
    }
}

pub fn build_router(state: &AppState) -> Router {
    Router::new()
        .merge(auth_router(state.user_service.clone(), state.auth_state.clone()))
        .merge(password_router(state.user_service.clone(), state.auth_state.clone()))
        .merge(admin_router(state.admin_service.clone(), state.auth_state.clone()))
        .merge(poll_router(state.poll_service.clone(), state.auth_state.clone()))
        .merge(vote_router(state.vote_service.clone(), state.auth_state.clone()))
        .route("/api/health", get(|| async { Json(json!({ "status": "ok" })) }))
}

pub struct App {
    config: AppConfig,
    router: Router,
    pub state: AppState,
}

impl App {
    pub async fn new() -> Result<Self, AppError> {
        let config = AppConfig::from_env()?;
        let jwt_config = JwtConfig::from_env()?;

        let storage = match config.storage {
            StorageBackend::Mongo => {
                let mongo_config = MongoConfig::from_env()?;
                Storage::mongo(&mongo_config).await?
            }
            StorageBackend::Memory => {
                warn!("Using in-memory storage; data is lost on shutdown");
                Storage::in_memory()
            }
        };

        let state = AppState::new(storage, jwt_config, Arc::new(SystemClock));
        let router = build_router(&state);
        let app = App { config, router, state };
        app.create_first_admin_user().await;
        Ok(app)
    }

    pub async fn start(self) -> Result<(), AppError> {
        let ip = self
            .config
            .host
            .parse()
            .map_err(|_| AppError::Address(self.config.host.clone()))?;
        let addr = SocketAddr::new(ip, self.config.port);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("🚀 Server running at http://{}", addr);
        axum::serve(listener, self.router).await?;
        Ok(())
    }

    async fn create_first_admin_user(&self) {
        let admin_conf = match AdminUserConfig::from_env() {
            Ok(c) => c,
            Err(e) => {
                warn!("Admin user config not loaded: {e}");
                return;
            }
        };

        match self.state.user_service.bootstrap_admin(&admin_conf.email, &admin_conf.password).await {
            Ok(Some(admin)) => info!(admin_id = %admin.id, "Bootstrap admin ready"),
            Ok(None) => {}
            Err(e) => error!("Failed to create bootstrap admin: {e}"),
        }
    }
}
