use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::auth::token::{Identity, TokenService};
use crate::error::AppError;
use crate::models::{PublicUser, Role};
use crate::users::UserDirectory;

/// Registration and login.
#[derive(Clone)]
pub struct AuthService {
    users: UserDirectory,
    tokens: Arc<TokenService>,
    /// Checked against when the email is unknown, so both login failures cost one bcrypt verify.
    decoy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(users: UserDirectory, tokens: Arc<TokenService>) -> Self {
        Self {
            users,
            tokens,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Creates a plain `user` account. Roles are never taken from the caller.
    pub async fn register(
        &self,
        email: String,
        name: String,
        password: String,
    ) -> Result<PublicUser, AppError> {
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already exists".into()));
        }

        let user = self
            .users
            .create(email, name, password, vec![Role::User])
            .await?;
        Ok(user.into())
    }

    /// Exchanges credentials for a signed token.
    ///
    /// An unknown email and a wrong password fail identically.
    pub async fn login(&self, email: &str, password: String) -> Result<String, AppError> {
        let invalid = || AppError::Unauthorized("Invalid credentials".into());

        let hasher = self.users.hasher();
        let user = self.users.find_by_email(email).await?;
        let hashed_password = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.decoy_hash().await?,
        };
        let matches = hasher.verify_blocking(password, hashed_password).await?;

        match user {
            Some(user) if matches => self.tokens.issue(&Identity::from(&user)),
            Some(user) => {
                log::info!("Failed login for user {}", user.id);
                Err(invalid())
            }
            None => Err(invalid()),
        }
    }

    async fn decoy_hash(&self) -> Result<String, AppError> {
        let hasher = self.users.hasher();
        self.decoy_hash
            .get_or_try_init(|| hasher.hash_blocking("decoy-password".to_string()))
            .await
            .cloned()
    }
}
