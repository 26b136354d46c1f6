use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handler::admin_handler::{
    change_role_handler, create_account_handler, delete_user_handler, get_user_handler, list_users_handler,
    reset_password_handler,
};
use crate::middlewares::auth_middleware::{require_actor, AuthState};
use crate::service::admin_service::AdminService;

/// Every route here requires an authenticated actor; the service enforces the admin role.
pub fn admin_router(service: Arc<dyn AdminService>, auth_state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/api/admin/users", get(list_users_handler).post(create_account_handler))
        .route("/api/admin/users/{id}", get(get_user_handler).delete(delete_user_handler))
        .route("/api/admin/users/{id}/role", put(change_role_handler))
        .route("/api/admin/users/{id}/reset-password", post(reset_password_handler))
        .route_layer(middleware::from_fn_with_state(auth_state, require_actor))
        .with_state(service)
}
