pub mod admin_service;
pub mod lifecycle;
pub mod policy;
pub mod poll_service;
pub mod results;
pub mod user_service;
pub mod vote_service;
