use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use specreg_types::{CustomerId, SpecId, SpecVersion};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobKey, BlobStore};

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Documents are held behind a `RwLock`
/// and cloned on read/write. Data is lost when the store is dropped.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<BlobKey, String>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of documents currently stored, across all customers.
    pub fn len(&self) -> usize {
        self.read().map(|map| map.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<BlobKey, String>>> {
        self.blobs
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<BlobKey, String>>> {
        self.blobs
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn get(&self, sub: &CustomerId, spec_id: &SpecId, version: &SpecVersion) -> StoreResult<String> {
        let key = BlobKey::new(sub, spec_id, version);
        let map = self.read()?;
        map.get(&key).cloned().ok_or_else(|| key.not_found())
    }

    fn put(
        &self,
        sub: &CustomerId,
        spec_id: &SpecId,
        version: &SpecVersion,
        body: &str,
    ) -> StoreResult<()> {
        let key = BlobKey::new(sub, spec_id, version);
        self.write()?.insert(key, body.to_string());
        debug!(%spec_id, %version, bytes = body.len(), "blob stored");
        Ok(())
    }

    fn list_versions(&self, sub: &CustomerId, spec_id: &SpecId) -> StoreResult<Vec<SpecVersion>> {
        let map = self.read()?;
        let mut versions: Vec<SpecVersion> = map
            .keys()
            .filter(|k| &k.sub == sub && &k.spec_id == spec_id)
            .map(|k| k.version.clone())
            .collect();
        versions.sort();
        Ok(versions)
    }

    fn delete_spec(&self, sub: &CustomerId, spec_id: &SpecId) -> StoreResult<()> {
        self.write()?
            .retain(|k, _| !(&k.sub == sub && &k.spec_id == spec_id));
        debug!(%spec_id, "blobs deleted for spec");
        Ok(())
    }

    fn delete_all(&self, sub: &CustomerId) -> StoreResult<()> {
        self.write()?.retain(|k, _| &k.sub != sub);
        debug!("blobs deleted for customer");
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}
