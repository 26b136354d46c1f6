use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handler::vote_handler::{check_vote_handler, submit_vote_handler};
use crate::middlewares::auth_middleware::{require_actor, AuthState};
use crate::service::vote_service::VoteService;

pub fn vote_router(service: Arc<dyn VoteService>, auth_state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/api/votes", post(submit_vote_handler))
        .route("/api/votes/check", get(check_vote_handler))
        .route_layer(middleware::from_fn_with_state(auth_state, require_actor))
        .with_state(service)
}
