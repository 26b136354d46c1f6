use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::dto::user_dto::{
    AdminResetPasswordRequest, ChangeRoleRequest, CreateAccountRequest, MessageResponse, UserListQuery,
};
use crate::handler::parse_object_id;
use crate::model::user::Role;
use crate::service::admin_service::AdminService;
use crate::service::policy::Actor;
use crate::util::error::HandlerError;

fn parse_role(raw: &str) -> Result<Role, HandlerError> {
    raw.parse::<Role>().map_err(HandlerError::bad_request)
}

// Handler: List users, optionally filtered by role
pub async fn list_users_handler(
    State(service): State<Arc<dyn AdminService>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let role = query.role.as_deref().map(parse_role).transpose()?;
    let users = service.list_users(&actor, role).await?;
    Ok(Json(users))
}

// Handler: Create faculty or admin account
pub async fn create_account_handler(
    State(service): State<Arc<dyn AdminService>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = service.create_account(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user_handler(
    State(service): State<Arc<dyn AdminService>>,
    Extension(actor): Extension<Actor>,
    Path((id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "user")?;
    let user = service.get_user(&actor, &id).await?;
    Ok(Json(user))
}

pub async fn delete_user_handler(
    State(service): State<Arc<dyn AdminService>>,
    Extension(actor): Extension<Actor>,
    Path((id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "user")?;
    service.delete_user(&actor, &id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

pub async fn change_role_handler(
    State(service): State<Arc<dyn AdminService>>,
    Extension(actor): Extension<Actor>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<ChangeRoleRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "user")?;
    let role = parse_role(&payload.role)?;
    let user = service.change_role(&actor, &id, role).await?;
    Ok(Json(user))
}

pub async fn reset_password_handler(
    State(service): State<Arc<dyn AdminService>>,
    Extension(actor): Extension<Actor>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<AdminResetPasswordRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "user")?;
    service.reset_password(&actor, &id, payload).await?;
    Ok(Json(MessageResponse::new("Password reset successfully")))
}
