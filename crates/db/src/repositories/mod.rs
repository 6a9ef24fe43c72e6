use async_trait::async_trait;
use thiserror::Error;

use leadscout_core::domain::{DedupKey, StoredCompany, StoredContact};
use leadscout_core::errors::StoreError;

pub mod contact;
pub mod memory;

pub use contact::SqlContactRepository;
pub use memory::InMemoryContactRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Backend(error.to_string()),
            RepositoryError::Decode(message) => Self::Decode(message),
        }
    }
}

/// Read side of the contact store.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn find_by_key(&self, key: &DedupKey) -> Result<Option<StoredContact>, RepositoryError>;

    /// Most recent first.
    async fn list_contacts(&self, limit: u32) -> Result<Vec<StoredContact>, RepositoryError>;

    async fn count_contacts(&self) -> Result<u64, RepositoryError>;

    async fn list_companies(&self) -> Result<Vec<StoredCompany>, RepositoryError>;
}
