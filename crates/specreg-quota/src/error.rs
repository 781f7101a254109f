use specreg_db::DbError;

/// Errors that can occur while evaluating a quota.
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    /// The current model count could not be read.
    #[error("failed to read model count: {0}")]
    Store(#[from] DbError),
}

/// Convenience alias used throughout the quota crate.
pub type QuotaResult<T> = std::result::Result<T, QuotaError>;
