use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{AppError, AppResult};

/// PasswordHasher
///
/// The opaque hash/verify primitive for stored credentials. Handlers only see
/// this trait, so tests can swap bcrypt for the instant `MockHasher`.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &str) -> AppResult<String>;

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    async fn verify(&self, password: &str, hash: &str) -> AppResult<bool>;
}

pub type HasherState = Arc<dyn PasswordHasher>;

/// BcryptHasher
///
/// bcrypt on the blocking pool so a login never stalls the async workers.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub const DEFAULT_COST: u32 = 10;

    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COST)
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, password: &str) -> AppResult<String> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
            .map_err(AppError::from)
    }

    async fn verify(&self, password: &str, hash: &str) -> AppResult<bool> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))?
            .map_err(AppError::from)
    }
}

/// MockHasher
///
/// Reversible stand-in for tests: `hash("pw") == "mock$pw"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockHasher;

const MOCK_PREFIX: &str = "mock$";

#[async_trait]
impl PasswordHasher for MockHasher {
    async fn hash(&self, password: &str) -> AppResult<String> {
        Ok(format!("{MOCK_PREFIX}{password}"))
    }

    async fn verify(&self, password: &str, hash: &str) -> AppResult<bool> {
        match hash.strip_prefix(MOCK_PREFIX) {
            Some(stored) => Ok(stored == password),
            None => Err(AppError::Internal("not a mock hash".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bcrypt_round_trip() {
        // Minimum cost keeps the test fast.
        let hasher = BcryptHasher::new(4);
        let hash = hasher.hash("hunter22").await.unwrap();
        assert_ne!(hash, "hunter22");
        assert!(hasher.verify("hunter22", &hash).await.unwrap());
        assert!(!hasher.verify("hunter23", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn bcrypt_rejects_garbage_hashes() {
        let result = BcryptHasher::new(4).verify("pw", "not-a-hash").await;
        assert!(matches!(result, Err(AppError::Hashing(_))));
    }

    #[tokio::test]
    async fn mock_hasher_behaves_like_a_hasher() {
        let hash = MockHasher.hash("secret").await.unwrap();
        assert!(MockHasher.verify("secret", &hash).await.unwrap());
        assert!(!MockHasher.verify("other", &hash).await.unwrap());
    }
}
