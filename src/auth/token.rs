use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Role, User};

/// The authenticated subject of a request, as carried by a verified token.
///
/// Built from the user record when the token is issued and never refreshed
/// afterwards: a later role change only applies to tokens issued after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub sub: Uuid,
    pub name: String,
    pub roles: Vec<Role>,
}

impl Identity {
    pub fn has_any_role(&self, required: &[Role]) -> bool {
        self.roles.iter().any(|role| required.contains(role))
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            sub: user.id,
            name: user.name.clone(),
            roles: user.roles.clone(),
        }
    }
}

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token, the user's id.
    pub sub: Uuid,
    pub name: String,
    pub roles: Vec<Role>,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            sub: claims.sub,
            name: claims.name,
            roles: claims.roles,
        }
    }
}

/// Signs and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        // No grace period past `exp`.
        let mut validation = Validation::default();
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Generates a signed token for `identity`, valid for the configured lifetime.
    pub fn issue(&self, identity: &Identity) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::InternalServerError("Token lifetime out of range".into()))?;
        let claims = Claims {
            sub: identity.sub,
            name: identity.name.clone(),
            roles: identity.roles.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Verifies the signature and expiry of `token` and returns its identity.
    ///
    /// Malformed, wrongly signed and expired tokens all produce the same
    /// `AppError::Unauthorized("Invalid token")`.
    pub fn verify(&self, token: &str) -> Result<Identity, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.into())
            .map_err(|e| {
                log::debug!("Token rejected: {}", e);
                AppError::Unauthorized("Invalid token".into())
            })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_for_gen_verify";

    fn identity() -> Identity {
        Identity {
            sub: Uuid::new_v4(),
            name: "Test User".to_string(),
            roles: vec![Role::User, Role::Admin],
        }
    }

    fn service() -> TokenService {
        TokenService::new(SECRET, Duration::hours(1))
    }

    fn assert_invalid(result: Result<Identity, AppError>) {
        match result {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Invalid token"),
            other => panic!("Expected an invalid token error, got {:?}", other),
        }
    }

    #[test]
    fn test_token_generation_and_verification() {
        let identity = identity();
        let token = service().issue(&identity).unwrap();
        assert_eq!(service().verify(&token).unwrap(), identity);
    }

    #[test]
    fn test_token_expiration() {
        let expired = Claims {
            sub: Uuid::new_v4(),
            name: "Expired".to_string(),
            roles: vec![Role::User],
            iat: (Utc::now() - Duration::hours(3)).timestamp(),
            exp: (Utc::now() - Duration::hours(2)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &expired,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_invalid(service().verify(&token));
    }

    #[test]
    fn test_no_grace_period_after_expiry() {
        let token = TokenService::new(SECRET, Duration::seconds(-5))
            .issue(&identity())
            .unwrap();
        assert_invalid(service().verify(&token));
    }

    #[test]
    fn test_unrepresentable_lifetime_is_an_error() {
        let service = TokenService::new(SECRET, Duration::MAX);
        match service.issue(&identity()) {
            Err(AppError::InternalServerError(msg)) => assert_eq!(msg, "Token lifetime out of range"),
            other => panic!("Expected an internal error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_token_signature() {
        let token = TokenService::new("a_completely_different_secret", Duration::hours(1))
            .issue(&identity())
            .unwrap();
        assert_invalid(service().verify(&token));
    }

    #[test]
    fn test_malformed_token() {
        assert_invalid(service().verify("not-a-jwt"));
        assert_invalid(service().verify(""));
    }

    #[test]
    fn test_claims_carry_lifetime() {
        let token = service().issue(&identity()).unwrap();
        let mut validation = Validation::default();
        validation.validate_exp = false;
        let claims = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &validation,
        )
        .unwrap()
        .claims;
        assert_eq!(claims.exp - claims.iat, 3600);
    }
}
