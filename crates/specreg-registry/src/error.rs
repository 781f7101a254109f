use thiserror::Error;

use specreg_crypto::SecretError;
use specreg_db::DbError;
use specreg_quota::QuotaError;
use specreg_spec::SpecError;
use specreg_store::StoreError;
use specreg_types::{SpecVersion, TypeError};

/// Errors returned by registry operations.
///
/// Every variant propagates unchanged to the transport boundary, which is
/// the only place user-facing status is attached.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The uploaded document or an identifier is invalid.
    #[error("the spec is not valid, {0}")]
    Validation(String),

    /// The version in the request does not match the version derived from
    /// the document.
    #[error("the requested version {declared} does not match the version of the spec {derived}")]
    VersionMismatch {
        declared: SpecVersion,
        derived: SpecVersion,
    },

    /// Accepting the write would exceed the customer's quota.
    #[error("{0}")]
    QuotaExceeded(String),

    /// The referenced spec, version or credential does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The public key is already registered to another credential.
    #[error("public key {0} is already in use")]
    PublicKeyConflict(String),

    /// Blob store fault.
    #[error("storage error: {0}")]
    Storage(StoreError),

    /// Metadata store fault.
    #[error("database error: {0}")]
    Database(DbError),
}

/// Coarse classification of a [`RegistryError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    VersionMismatch,
    QuotaExceeded,
    NotFound,
    Conflict,
    Storage,
    Database,
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::VersionMismatch { .. } => ErrorKind::VersionMismatch,
            Self::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::PublicKeyConflict(_) => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Database(_) => ErrorKind::Database,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<SpecError> for RegistryError {
    fn from(e: SpecError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<TypeError> for RegistryError {
    fn from(e: TypeError) -> Self {
        Self::Validation(e.to_string())
    }
}

/// Lookup misses become `NotFound`; everything else is a storage fault.
impl From<StoreError> for RegistryError {
    fn from(e: StoreError) -> Self {
        if e.is_not_found() {
            Self::NotFound(e.to_string())
        } else {
            Self::Storage(e)
        }
    }
}

/// Lookup misses become `NotFound`, key collisions `PublicKeyConflict`;
/// everything else is a database fault.
impl From<DbError> for RegistryError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { .. } => Self::NotFound(e.to_string()),
            DbError::PublicKeyConflict { public_key } => Self::PublicKeyConflict(public_key),
            other => Self::Database(other),
        }
    }
}

impl From<QuotaError> for RegistryError {
    fn from(e: QuotaError) -> Self {
        match e {
            QuotaError::Store(db) => Self::Database(db),
        }
    }
}

impl From<SecretError> for RegistryError {
    fn from(e: SecretError) -> Self {
        Self::Database(DbError::Serialization(e.to_string()))
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use specreg_types::{CustomerId, SpecId};

    #[test]
    fn store_not_found_is_distinct_from_storage_fault() {
        let missing = StoreError::NotFound {
            sub: CustomerId::new("a").unwrap(),
            spec_id: SpecId::new("pets").unwrap(),
            version: SpecVersion::new("1").unwrap(),
        };
        assert_eq!(RegistryError::from(missing).kind(), ErrorKind::NotFound);

        let io = StoreError::Io(std::io::Error::other("disk gone"));
        assert_eq!(RegistryError::from(io).kind(), ErrorKind::Storage);
    }

    #[test]
    fn db_errors_are_classified() {
        let missing = DbError::NotFound {
            entity: "spec",
            key: "pets".into(),
        };
        assert!(RegistryError::from(missing).is_not_found());

        let conflict = DbError::PublicKeyConflict {
            public_key: "pk_1".into(),
        };
        assert_eq!(RegistryError::from(conflict).kind(), ErrorKind::Conflict);

        let down = DbError::Unavailable("lock poisoned".into());
        assert_eq!(RegistryError::from(down).kind(), ErrorKind::Database);
    }

    #[test]
    fn version_mismatch_message_names_both_versions() {
        let err = RegistryError::VersionMismatch {
            declared: SpecVersion::new("2").unwrap(),
            derived: SpecVersion::new("1").unwrap(),
        };
        let msg = err.to_string();
        assert_eq!(
            msg,
            "the requested version 2 does not match the version of the spec 1"
        );
    }
}
