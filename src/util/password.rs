//! Password hashing and verification utilities
//!
//! Credentials are hashed with Argon2id and never logged, not even in part.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde::Serialize;
use tracing::{debug, error};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Error types for password operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),
    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),
    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Advisory strength report. Does not gate registration, which only enforces the minimum length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    pub score: u8,
    pub feedback: Vec<String>,
}

pub trait PasswordUtils {
    /// Hashes the given password using Argon2id algorithm
    fn hash_password(password: &str) -> Result<String, PasswordError>;

    /// Verifies the given password against the stored hash
    fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError>;

    fn check_strength(password: &str) -> PasswordStrength;
}

pub struct PasswordUtilsImpl;

impl PasswordUtils for PasswordUtilsImpl {
    fn hash_password(password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        match argon2.hash_password(password.as_bytes(), &salt) {
            Ok(password_hash) => {
                debug!("Password successfully hashed");
                Ok(password_hash.to_string())
            }
            Err(err) => {
                error!("Failed to hash password: {}", err);
                Err(PasswordError::HashingFailed(err.to_string()))
            }
        }
    }

    fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(hash) => hash,
            Err(err) => {
                error!("Invalid password hash format: {}", err);
                return Err(PasswordError::InvalidHashFormat);
            }
        };

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                debug!("Password verification failed - invalid password");
                Ok(false)
            }
            Err(err) => {
                error!("Password verification error: {}", err);
                Err(PasswordError::VerificationFailed(err.to_string()))
            }
        }
    }

    fn check_strength(password: &str) -> PasswordStrength {
        let mut score = 0;
        let mut feedback = Vec::new();
        let length = password.chars().count();

        if length >= 12 {
            score += 2;
            feedback.push("Good length (12+ characters)".to_string());
        } else if length >= 8 {
            score += 1;
            feedback.push("Acceptable length (8+ characters)".to_string());
        } else {
            feedback.push("Short password (use 8+ characters)".to_string());
        }

        if password.chars().any(|c| c.is_ascii_uppercase()) {
            score += 1;
            feedback.push("Contains uppercase letters".to_string());
        } else {
            feedback.push("Add uppercase letters for strength".to_string());
        }

        if password.chars().any(|c| c.is_ascii_digit()) {
            score += 1;
            feedback.push("Contains numbers".to_string());
        } else {
            feedback.push("Add numbers for strength".to_string());
        }

        if password.chars().any(|c| "!@#$%^&*".contains(c)) {
            score += 1;
            feedback.push("Contains special characters".to_string());
        } else {
            feedback.push("Add special characters for strength".to_string());
        }

        PasswordStrength { score, feedback }
    }
}
