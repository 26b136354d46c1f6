use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use crate::handler::password_handler::{change_password_handler, check_strength_handler};
use crate::middlewares::auth_middleware::{require_actor, AuthState};
use crate::service::user_service::UserService;

pub fn password_router(service: Arc<dyn UserService>, auth_state: Arc<AuthState>) -> Router {
    // Strength check is advisory and needs no account.
    let public = Router::new().route("/api/password/check-strength", post(check_strength_handler));

    let authenticated = Router::new()
        .route("/api/password/change-password", post(change_password_handler))
        .route_layer(middleware::from_fn_with_state(auth_state, require_actor));

    public.merge(authenticated).with_state(service)
}
