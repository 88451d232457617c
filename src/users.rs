//! User directory: lookup and creation on top of a [`UserStore`].

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::password::PasswordHasher;
use crate::error::AppError;
use crate::models::{NewUser, Role, User};
use crate::store::UserStore;

#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    pub fn hasher(&self) -> PasswordHasher {
        self.hasher
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.store.find_user_by_email(email).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.store.find_user(id).await
    }

    /// Hashes `password` and stores a new user with the given roles.
    ///
    /// An empty role list stores `[user]`. Fails with `Conflict` if the email is taken.
    pub async fn create(
        &self,
        email: String,
        name: String,
        password: String,
        roles: Vec<Role>,
    ) -> Result<User, AppError> {
        let password_hash = self.hasher.hash_blocking(password).await?;
        let user = self
            .store
            .insert_user(NewUser {
                email,
                name,
                password_hash,
                roles,
            })
            .await?;

        log::info!("Created user {}", user.id);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn directory() -> UserDirectory {
        UserDirectory::new(
            Arc::new(MemoryStore::new()),
            PasswordHasher::new(crate::auth::password::MIN_COST),
        )
    }

    #[actix_rt::test]
    async fn test_create_stores_hash_not_password() {
        let users = directory();
        let user = users
            .create(
                "dir@example.com".into(),
                "Dir".into(),
                "Secret1!".into(),
                vec![],
            )
            .await
            .unwrap();

        assert_ne!(user.password_hash, "Secret1!");
        assert!(users.hasher().verify("Secret1!", &user.password_hash).unwrap());
        assert_eq!(user.roles, vec![Role::User]);

        let found = users.find_by_email("dir@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(users.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }
}
