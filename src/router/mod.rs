pub mod admin_router;
pub mod auth_router;
pub mod password_router;
pub mod poll_router;
pub mod vote_router;
