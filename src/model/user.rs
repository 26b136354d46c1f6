use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role. Stored lowercase; `user` is accepted as a legacy spelling of `student`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Faculty,
    #[serde(alias = "user")]
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Faculty => "faculty",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "faculty" => Ok(Role::Faculty),
            "student" | "user" => Ok(Role::Student),
            other => Err(format!("Invalid role '{}'. Must be one of: admin, faculty, student", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    /// Admin who created the account. `None` for self-registered students and the bootstrap admin.
    pub created_by: Option<ObjectId>,
    #[serde(default, with = "crate::model::bson_time")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::model::bson_time")]
    pub password_changed_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(email: impl Into<String>, password_hash: String, role: Role, created_by: Option<ObjectId>) -> Self {
        User {
            id: None,
            email: email.into(),
            password_hash,
            role,
            created_by,
            created_at: None,
            password_changed_at: None,
        }
    }
}
