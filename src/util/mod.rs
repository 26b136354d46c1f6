pub mod clock;
pub mod error;
pub mod jwt;
pub mod logger;
pub mod password;
