//! Storage interfaces for spec metadata and credentials.
//!
//! Any backend (in-memory, journaled, relational) implements these traits.
//! The registry only ever sees them through [`MetadataStore`].

use specreg_types::{CredentialId, CustomerId, SpecId, SpecVersion};

use crate::error::DbResult;
use crate::model::{CredentialAuthInfo, CredentialRecord, NewCredential, SpecMetadata, SpecRecord, SpecSummary};

/// Storage for spec version metadata and the latest-version index.
///
/// Implementations must be thread-safe and keep customers fully isolated.
/// Every call completes or fails in bounded time.
pub trait SpecStore: Send + Sync {
    /// Sum of `model_count` over the latest version of each of the
    /// customer's specs. Older versions do not count. `0` if none exist.
    fn count_customer_models(&self, sub: &CustomerId) -> DbResult<u64>;

    /// Idempotent upsert keyed by `(sub, spec_id, meta.version)`.
    ///
    /// The written version becomes the spec's latest version. Returns the
    /// stored record.
    fn create_update_spec(
        &self,
        sub: &CustomerId,
        spec_id: &SpecId,
        meta: &SpecMetadata,
    ) -> DbResult<SpecRecord>;

    /// Version the latest-version index points at for the spec.
    ///
    /// Fails with `NotFound` if the spec has no versions.
    fn get_latest_version(&self, sub: &CustomerId, spec_id: &SpecId) -> DbResult<SpecVersion>;

    /// One stored version. Fails with `NotFound` if absent.
    fn get_spec(
        &self,
        sub: &CustomerId,
        spec_id: &SpecId,
        version: &SpecVersion,
    ) -> DbResult<SpecRecord>;

    /// Latest entry per spec id, ordered by spec id.
    fn list_specs(&self, sub: &CustomerId) -> DbResult<Vec<SpecSummary>>;

    /// All versions of a spec, most recently updated first.
    ///
    /// Fails with `NotFound` if the spec has no versions.
    fn list_spec_versions(&self, sub: &CustomerId, spec_id: &SpecId) -> DbResult<Vec<SpecSummary>>;

    /// Remove every version of a spec. Succeeds if nothing existed.
    fn delete_spec(&self, sub: &CustomerId, spec_id: &SpecId) -> DbResult<()>;

    /// Remove every spec of a customer. Succeeds if nothing existed.
    fn delete_all_specs(&self, sub: &CustomerId) -> DbResult<()>;

    /// The record the latest-version index points at.
    fn get_latest_spec(&self, sub: &CustomerId, spec_id: &SpecId) -> DbResult<SpecRecord> {
        let version = self.get_latest_version(sub, spec_id)?;
        self.get_spec(sub, spec_id, &version)
    }
}

/// Storage for API credentials.
///
/// Public keys are unique across all customers.
pub trait CredentialStore: Send + Sync {
    /// All of a customer's credentials, ordered by id.
    fn list_credentials(&self, sub: &CustomerId) -> DbResult<Vec<CredentialRecord>>;

    /// Create or replace the credential `(sub, id)`.
    ///
    /// Fails with `PublicKeyConflict` if the public key belongs to any other
    /// credential, of this customer or another one.
    fn create_update_credential(
        &self,
        sub: &CustomerId,
        id: &CredentialId,
        credential: &NewCredential,
    ) -> DbResult<CredentialRecord>;

    /// One credential. Fails with `NotFound` if absent.
    fn get_credential(&self, sub: &CustomerId, id: &CredentialId) -> DbResult<CredentialRecord>;

    /// Resolve a public key to its owner. Fails with `NotFound` if unknown.
    fn get_user(&self, public_key: &str) -> DbResult<CredentialAuthInfo>;

    /// Remove one credential. Succeeds if it did not exist.
    fn delete_credential(&self, sub: &CustomerId, id: &CredentialId) -> DbResult<()>;

    /// Remove every credential of a customer. Succeeds if none existed.
    fn delete_all_credentials(&self, sub: &CustomerId) -> DbResult<()>;
}

/// The combined metadata store the registry is built on.
pub trait MetadataStore: SpecStore + CredentialStore {}

impl<T: SpecStore + CredentialStore> MetadataStore for T {}
