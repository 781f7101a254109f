use specreg_types::{CustomerId, SpecId, SpecVersion};

use crate::error::{StoreError, StoreResult};

/// Key of one stored document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobKey {
    pub sub: CustomerId,
    pub spec_id: SpecId,
    pub version: SpecVersion,
}

impl BlobKey {
    pub fn new(sub: &CustomerId, spec_id: &SpecId, version: &SpecVersion) -> Self {
        Self {
            sub: sub.clone(),
            spec_id: spec_id.clone(),
            version: version.clone(),
        }
    }

    /// The `NotFound` error for this key.
    pub fn not_found(&self) -> StoreError {
        StoreError::NotFound {
            sub: self.sub.clone(),
            spec_id: self.spec_id.clone(),
            version: self.version.clone(),
        }
    }
}

/// Versioned document store.
///
/// All implementations must satisfy these invariants:
/// - `put` is an idempotent upsert keyed by `(sub, spec_id, version)`.
/// - `get` of a missing key returns [`StoreError::NotFound`].
/// - Customers are isolated: no operation observes another customer's data.
/// - Every call completes or fails in bounded time; nothing blocks on other
///   callers beyond a short critical section.
pub trait BlobStore: Send + Sync {
    /// Read the document stored under the key.
    fn get(&self, sub: &CustomerId, spec_id: &SpecId, version: &SpecVersion) -> StoreResult<String>;

    /// Create or replace the document stored under the key.
    fn put(
        &self,
        sub: &CustomerId,
        spec_id: &SpecId,
        version: &SpecVersion,
        body: &str,
    ) -> StoreResult<()>;

    /// All stored versions of a spec, sorted. Empty if none exist.
    fn list_versions(&self, sub: &CustomerId, spec_id: &SpecId) -> StoreResult<Vec<SpecVersion>>;

    /// Delete every version of a spec. Succeeds if nothing was stored.
    fn delete_spec(&self, sub: &CustomerId, spec_id: &SpecId) -> StoreResult<()>;

    /// Delete every document of a customer. Succeeds if nothing was stored.
    fn delete_all(&self, sub: &CustomerId) -> StoreResult<()>;

    /// Check whether a document exists under the key.
    fn exists(&self, sub: &CustomerId, spec_id: &SpecId, version: &SpecVersion) -> StoreResult<bool> {
        match self.get(sub, spec_id, version) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
