pub mod bson_time;
pub mod poll;
pub mod user;
pub mod vote;
