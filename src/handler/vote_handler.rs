use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::dto::poll_dto::{HasVotedQuery, SubmitVoteRequest};
use crate::handler::parse_object_id;
use crate::service::policy::Actor;
use crate::service::vote_service::VoteService;
use crate::util::error::HandlerError;

// Handler: Cast a vote; the response carries the updated results
pub async fn submit_vote_handler(
    State(service): State<Arc<dyn VoteService>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<SubmitVoteRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let poll_id = parse_object_id(&payload.poll_id, "poll")?;
    let option_id = parse_object_id(&payload.option_id, "option")?;
    let receipt = service.submit_vote(&actor, &poll_id, &option_id).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn check_vote_handler(
    State(service): State<Arc<dyn VoteService>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<HasVotedQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let poll_id = parse_object_id(&query.poll_id, "poll")?;
    let res = service.has_voted(&actor, &poll_id).await?;
    Ok(Json(res))
}
