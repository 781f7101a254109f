//! Error types for metadata store operations.

use thiserror::Error;

/// Errors that can occur during metadata store operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// The requested record was not found.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// The public key is already registered to a different credential.
    #[error("public key {public_key} is already in use")]
    PublicKeyConflict { public_key: String },

    /// The store cannot serve requests (poisoned lock, closed journal).
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A journal frame is damaged but valid entries follow it. Recovery
    /// refuses to discard them.
    #[error("metadata journal is corrupt at byte {offset}; valid entries resume at byte {resume_at}")]
    CorruptJournal { offset: u64, resume_at: u64 },

    /// I/O error from the journal.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbError {
    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Returns `true` if this is a lookup miss rather than a storage fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a public-key uniqueness violation.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::PublicKeyConflict { .. })
    }
}

/// Convenience type alias for metadata store operations.
pub type DbResult<T> = std::result::Result<T, DbError>;
