use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::dto::user_dto::{LoginRequest, RefreshTokenRequest, RegisterRequest};
use crate::service::policy::Actor;
use crate::service::user_service::UserService;
use crate::util::error::HandlerError;

// Register (always a student account)
pub async fn register_handler(
    State(service): State<Arc<dyn UserService>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = service.register_student(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

// Login
pub async fn login_handler(
    State(service): State<Arc<dyn UserService>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = service.login(payload.email, payload.password).await?;
    Ok(Json(res))
}

// Refresh Token
pub async fn refresh_token_handler(
    State(service): State<Arc<dyn UserService>>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if let Err(e) = payload.validate() {
        return Err(HandlerError::bad_request(format!("Validation error: {}", e)));
    }
    let tokens = service.refresh_token(payload.refresh_token).await?;
    Ok(Json(tokens))
}

// Profile of the authenticated account
pub async fn profile_handler(
    State(service): State<Arc<dyn UserService>>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = service.profile(&actor).await?;
    Ok(Json(user))
}
