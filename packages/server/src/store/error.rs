use sea_orm::DbErr;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or a read failed.
    #[error("backing store unavailable: {0}")]
    Unavailable(#[from] DbErr),

    /// A staged operation was rejected; the transaction was rolled back.
    #[error("transaction not applied: {0}")]
    CommitFailed(String),
}
