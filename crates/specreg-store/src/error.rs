use specreg_types::{CustomerId, SpecId, SpecVersion};

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested document was not found.
    #[error("spec {spec_id} version {version} not found for customer {sub}")]
    NotFound {
        sub: CustomerId,
        spec_id: SpecId,
        version: SpecVersion,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored file name could not be mapped back to a key.
    #[error("corrupt store entry {path}: {reason}")]
    CorruptEntry { path: String, reason: String },

    /// An in-memory lock was poisoned by a panicking writer.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns `true` if this is a lookup miss rather than a storage fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
