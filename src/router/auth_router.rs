use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handler::auth_handler::{login_handler, profile_handler, refresh_token_handler, register_handler};
use crate::middlewares::auth_middleware::{require_actor, AuthState};
use crate::service::user_service::UserService;

pub fn auth_router(service: Arc<dyn UserService>, auth_state: Arc<AuthState>) -> Router {
    let public = Router::new()
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/refresh-token", post(refresh_token_handler));

    let authenticated = Router::new()
        .route("/api/auth/profile", get(profile_handler))
        .route_layer(middleware::from_fn_with_state(auth_state, require_actor));

    public.merge(authenticated).with_state(service)
}
