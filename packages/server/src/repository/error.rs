use common::storage::StorageError;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Blob(#[from] StorageError),

    /// Stored data violates an invariant the repository relies on.
    #[error("corrupt entity data: {0}")]
    Corrupt(String),
}
