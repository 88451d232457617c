pub mod extractors;
pub mod middleware;
pub mod ownership;
pub mod password;
pub mod policy;
pub mod service;
pub mod token;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub use extractors::CurrentUser;
pub use middleware::{AuthGuard, RoleGuard};
pub use ownership::assert_owner;
pub use password::PasswordHasher;
pub use policy::{Access, AccessPolicy};
pub use service::AuthService;
pub use token::{Claims, Identity, TokenService};

lazy_static! {
    static ref UPPERCASE_REGEX: Regex = Regex::new(r"[A-Z]").unwrap();
    static ref DIGIT_REGEX: Regex = Regex::new(r"[0-9]").unwrap();
    static ref SPECIAL_REGEX: Regex = Regex::new(r"[^A-Za-z0-9]").unwrap();
}

fn policy_error(message: &'static str) -> ValidationError {
    let mut err = ValidationError::new("password_policy");
    err.message = Some(message.into());
    err
}

/// Requires an uppercase letter, a digit and a non-alphanumeric character.
fn validate_password_policy(password: &str) -> Result<(), ValidationError> {
    if !UPPERCASE_REGEX.is_match(password) {
        return Err(policy_error("Password must contain 1 uppercase letter"));
    }
    if !DIGIT_REGEX.is_match(password) {
        return Err(policy_error("Password must contain at least 1 number"));
    }
    if !SPECIAL_REGEX.is_match(password) {
        return Err(policy_error("Password must contain at least 1 special character"));
    }
    Ok(())
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
///
/// There is deliberately no `roles` field: unknown fields are dropped during
/// deserialization, so a client cannot pick its own roles.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Must be a valid email format.
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub name: String,
    /// At least 6 characters, with an uppercase letter, a digit and a special character.
    #[validate(length(min = 6), custom = "validate_password_policy")]
    pub password: String,
}

/// Body returned by a successful login.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}
