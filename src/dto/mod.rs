pub mod poll_dto;
pub mod user_dto;
