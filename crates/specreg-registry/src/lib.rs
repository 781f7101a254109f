//! The spec registry.
//!
//! [`Registry`] is the single entry point the transport layer talks to. It
//! owns the write workflow for uploaded specs (validate, check the version,
//! check the quota, store the document, store the metadata) and exposes the
//! read, delete and credential operations over the same stores.
//!
//! Errors are reported as [`RegistryError`], whose [`ErrorKind`] tells
//! callers which outcome to surface: invalid input, version conflict, quota,
//! missing entity, or a store fault.

pub mod error;
pub mod registry;

pub use error::{ErrorKind, RegistryError, RegistryResult};
pub use registry::{IssuedCredential, Registry};

// Re-export the types callers need to drive a registry.
pub use specreg_db::{CredentialAuthInfo, CredentialInfo, NewCredential, SpecSummary};
pub use specreg_quota::{EnvLimit, LimitSource, QuotaPolicy, SharedLimit};
pub use specreg_types::{CredentialId, CustomerId, Language, SpecId, SpecVersion};
