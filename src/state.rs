use std::sync::Arc;

use crate::auth::{AuthService, PasswordHasher, TokenService};
use crate::config::Config;
use crate::store::{TaskStore, UserStore};
use crate::users::UserDirectory;

/// Shared services, registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub users: UserDirectory,
    pub tasks: Arc<dyn TaskStore>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
        tokens: Arc<TokenService>,
        hasher: PasswordHasher,
    ) -> Self {
        let users = UserDirectory::new(users, hasher);
        Self {
            auth: AuthService::new(users.clone(), tokens),
            users,
            tasks,
        }
    }

    /// Wires the services described by `config` over the given stores.
    pub fn from_config(
        config: &Config,
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(&config.jwt_secret, config.jwt_expires_in));
        Self::new(users, tasks, tokens, PasswordHasher::new(config.bcrypt_cost))
    }

    pub fn tokens(&self) -> Arc<TokenService> {
        self.auth.tokens().clone()
    }
}
