use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse-grained permission label attached to a user and carried in tokens.
/// Stored as lowercase text in the `users.roles` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
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
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A user record as held by the store, including the password hash.
///
/// Deliberately not `Serialize`: anything leaving the service goes through
/// [`PublicUser`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    /// Ordered, duplicate-free, never empty.
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to persist a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

impl NewUser {
    /// Returns the role list with duplicates removed, falling back to `[user]` when empty.
    pub fn normalized_roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = Vec::with_capacity(self.roles.len());
        for role in &self.roles {
            if !roles.contains(role) {
                roles.push(*role);
            }
        }
        if roles.is_empty() {
            roles.push(Role::User);
        }
        roles
    }
}

/// The user representation returned by the API. Never contains the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub roles: Vec<Role>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            roles: user.roles,
        }
    }
}
