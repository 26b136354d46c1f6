use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    response::IntoResponse,
};

use crate::dto::user_dto::{ChangePasswordRequest, CheckStrengthRequest, MessageResponse};
use crate::service::policy::Actor;
use crate::service::user_service::UserService;
use crate::util::error::HandlerError;

pub async fn change_password_handler(
    State(service): State<Arc<dyn UserService>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    service.change_password(&actor, payload).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

pub async fn check_strength_handler(
    State(service): State<Arc<dyn UserService>>,
    Json(payload): Json<CheckStrengthRequest>,
) -> impl IntoResponse {
    Json(service.check_password_strength(&payload.password))
}
