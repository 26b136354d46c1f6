use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use bson::oid::ObjectId;
use tracing::{debug, warn};

use crate::repository::user_repo::UserRepository;
use crate::service::policy::Actor;
use crate::util::error::{HandlerError, ServiceError};
use crate::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};

pub struct AuthState {
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
    pub user_repo: Arc<dyn UserRepository>,
}

/// Resolves the bearer token into an [`Actor`] and stores it in the request extensions.
///
/// The role comes from the stored account, not the token claims, so role changes and
/// deletions take effect on the next request rather than at token expiry.
pub async fn require_actor(
    State(state): State<Arc<AuthState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, HandlerError> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| HandlerError::unauthorized("Missing authorization header"))?;

    let token = state
        .jwt_utils
        .extract_token_from_header(auth_header)
        .map_err(|_| HandlerError::unauthorized("Malformed authorization header"))?;
    let claims = state.jwt_utils.validate_access_token(&token).map_err(|e| {
        debug!("Access token rejected: {}", e);
        HandlerError::unauthorized("Invalid or expired token")
    })?;

    let user_id =
        ObjectId::parse_str(&claims.sub).map_err(|_| HandlerError::unauthorized("Invalid token subject"))?;
    let user = state
        .user_repo
        .find_by_id(&user_id)
        .await
        .map_err(|e| HandlerError::from(ServiceError::from(e)))?
        .ok_or_else(|| {
            warn!(user_id = %user_id, "Token presented for a deleted account");
            HandlerError::unauthorized("Account no longer exists")
        })?;

    req.extensions_mut().insert(Actor::new(user_id, user.role));
    Ok(next.run(req).await)
}
