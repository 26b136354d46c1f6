use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::dto::poll_dto::{CreatePollRequest, OptionRequest, ScheduleRequest, UpdatePollRequest};
use crate::dto::user_dto::MessageResponse;
use crate::handler::parse_object_id;
use crate::service::policy::Actor;
use crate::service::poll_service::PollService;
use crate::util::error::HandlerError;

// Handler: Create poll (faculty)
pub async fn create_poll_handler(
    State(service): State<Arc<dyn PollService>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreatePollRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let poll = service.create_poll(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(poll)))
}

// Handler: Polls open for voting (students)
pub async fn list_votable_polls_handler(
    State(service): State<Arc<dyn PollService>>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, HandlerError> {
    let polls = service.list_votable_polls(&actor).await?;
    Ok(Json(polls))
}

// Handler: Own polls with results (faculty)
pub async fn list_own_polls_handler(
    State(service): State<Arc<dyn PollService>>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, HandlerError> {
    let polls = service.list_own_with_results(&actor).await?;
    Ok(Json(polls))
}

// Handler: Every poll with results (admin, read-only)
pub async fn list_all_polls_handler(
    State(service): State<Arc<dyn PollService>>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, HandlerError> {
    let polls = service.list_all_with_results(&actor).await?;
    Ok(Json(polls))
}

pub async fn get_poll_handler(
    State(service): State<Arc<dyn PollService>>,
    Extension(actor): Extension<Actor>,
    Path((id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "poll")?;
    let poll = service.get_poll(&actor, &id).await?;
    Ok(Json(poll))
}

pub async fn update_poll_handler(
    State(service): State<Arc<dyn PollService>>,
    Extension(actor): Extension<Actor>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<UpdatePollRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "poll")?;
    let poll = service.update_poll(&actor, &id, payload).await?;
    Ok(Json(poll))
}

pub async fn reschedule_poll_handler(
    State(service): State<Arc<dyn PollService>>,
    Extension(actor): Extension<Actor>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<ScheduleRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "poll")?;
    let poll = service.reschedule_poll(&actor, &id, payload).await?;
    Ok(Json(poll))
}

pub async fn delete_poll_handler(
    State(service): State<Arc<dyn PollService>>,
    Extension(actor): Extension<Actor>,
    Path((id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "poll")?;
    service.delete_poll(&actor, &id).await?;
    Ok(Json(MessageResponse::new("Poll deleted successfully")))
}

pub async fn poll_results_handler(
    State(service): State<Arc<dyn PollService>>,
    Extension(actor): Extension<Actor>,
    Path((id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "poll")?;
    let results = service.get_results(&actor, &id).await?;
    Ok(Json(results))
}

pub async fn reset_votes_handler(
    State(service): State<Arc<dyn PollService>>,
    Extension(actor): Extension<Actor>,
    Path((id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "poll")?;
    let res = service.reset_votes(&actor, &id).await?;
    Ok(Json(res))
}

// Handler: Add option to an existing poll
pub async fn add_option_handler(
    State(service): State<Arc<dyn PollService>>,
    Extension(actor): Extension<Actor>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<OptionRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "poll")?;
    let option = service.add_option(&actor, &id, payload).await?;
    Ok((StatusCode::CREATED, Json(option)))
}

pub async fn update_option_handler(
    State(service): State<Arc<dyn PollService>>,
    Extension(actor): Extension<Actor>,
    Path((option_id,)): Path<(String,)>,
    Json(payload): Json<OptionRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let option_id = parse_object_id(&option_id, "option")?;
    let option = service.update_option(&actor, &option_id, payload).await?;
    Ok(Json(option))
}

pub async fn delete_option_handler(
    State(service): State<Arc<dyn PollService>>,
    Extension(actor): Extension<Actor>,
    Path((option_id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let option_id = parse_object_id(&option_id, "option")?;
    service.delete_option(&actor, &option_id).await?;
    Ok(Json(MessageResponse::new("Option deleted successfully")))
}
