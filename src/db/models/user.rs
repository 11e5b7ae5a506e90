use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of actor. The set is closed.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Field worker: submits requests and the final photo.
    Worker,
    /// Municipal inspector: approves or rejects new requests.
    Inspector,
    /// Contractor company: executes approved requests.
    Contractor,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Worker, Role::Inspector, Role::Contractor];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Worker => "worker",
            Role::Inspector => "inspector",
            Role::Contractor => "contractor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public view of an account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Stored account, including the bcrypt hash.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserRecord {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }

    pub fn email_matches(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }
}
