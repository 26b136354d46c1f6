pub mod admin_handler;
pub mod auth_handler;
pub mod password_handler;
pub mod poll_handler;
pub mod vote_handler;

use bson::oid::ObjectId;

use crate::util::error::HandlerError;

pub(crate) fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, HandlerError> {
    ObjectId::parse_str(raw).map_err(|_| HandlerError::bad_request(format!("Invalid {} id", what)))
}
