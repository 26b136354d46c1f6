pub mod memory_store;
pub mod mongo_handle;
pub mod poll_repo;
pub mod repository_error;
pub mod user_repo;
pub mod vote_repo;
