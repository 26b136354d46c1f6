use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handler::poll_handler::{
    add_option_handler, create_poll_handler, delete_option_handler, delete_poll_handler, get_poll_handler,
    list_all_polls_handler, list_own_polls_handler, list_votable_polls_handler, poll_results_handler,
    reschedule_poll_handler, reset_votes_handler, update_option_handler, update_poll_handler,
};
use crate::middlewares::auth_middleware::{require_actor, AuthState};
use crate::service::poll_service::PollService;

pub fn poll_router(service: Arc<dyn PollService>, auth_state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/api/polls", get(list_votable_polls_handler).post(create_poll_handler))
        .route("/api/polls/mine", get(list_own_polls_handler))
        .route(
            "/api/polls/{id}",
            get(get_poll_handler).put(update_poll_handler).delete(delete_poll_handler),
        )
        .route("/api/polls/{id}/schedule", put(reschedule_poll_handler))
        .route("/api/polls/{id}/results", get(poll_results_handler))
        .route("/api/polls/{id}/options", post(add_option_handler))
        .route("/api/polls/{id}/reset-votes", post(reset_votes_handler))
        .route(
            "/api/polls/options/{option_id}",
            put(update_option_handler).delete(delete_option_handler),
        )
        .route("/api/admin/polls", get(list_all_polls_handler))
        .route_layer(middleware::from_fn_with_state(auth_state, require_actor))
        .with_state(service)
}
