use crate::error::AppError;

/// Lowest work factor bcrypt accepts. Only worth using in tests.
pub const MIN_COST: u32 = 4;
/// Highest work factor bcrypt accepts.
pub const MAX_COST: u32 = 31;

/// bcrypt-based one-way hashing for credentials.
///
/// Every hash embeds its own random salt and cost, so hashing the same password twice
/// yields different strings that both verify.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
    }

    /// Returns `Ok(false)` on mismatch; only a malformed `hashed_password` is an error.
    pub fn verify(&self, password: &str, hashed_password: &str) -> Result<bool, AppError> {
        bcrypt::verify(password, hashed_password).map_err(|e| {
            AppError::InternalServerError(format!("Failed to verify password: {}", e))
        })
    }

    /// Hashes on the blocking thread pool so the calling worker keeps serving requests.
    pub async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    pub async fn verify_blocking(
        &self,
        password: String,
        hashed_password: String,
    ) -> Result<bool, AppError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hashed_password)).await?
    }
}
