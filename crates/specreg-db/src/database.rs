//! Metadata database over the shared indexes.
//!
//! [`Database`] serializes writers on a `RwLock`, journals each mutation
//! while holding it, and then applies it. Journal order therefore always
//! equals apply order, which is what makes replay reproduce the same state.

use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use specreg_types::{CredentialId, CustomerId, HybridClock, SpecId, SpecVersion};

use crate::error::{DbError, DbResult};
use crate::journal::{Journal, NoJournal, SyncMode, WriteAheadLog};
use crate::model::{
    CredentialAuthInfo, CredentialRecord, NewCredential, SpecMetadata, SpecRecord, SpecSummary,
};
use crate::state::{MetadataState, Mutation};
use crate::traits::{CredentialStore, SpecStore};

/// Metadata store backed by in-memory indexes and a mutation journal.
pub struct Database<J: Journal> {
    state: RwLock<MetadataState>,
    clock: HybridClock,
    journal: J,
}

/// Volatile database. Data is lost when it is dropped.
pub type InMemoryDatabase = Database<NoJournal>;

/// Durable database journaling to a write-ahead log.
pub type WalDatabase = Database<WriteAheadLog>;

impl Database<NoJournal> {
    /// Create a new empty in-memory database.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MetadataState::new()),
            clock: HybridClock::new(),
            journal: NoJournal,
        }
    }
}

impl Default for Database<NoJournal> {
    fn default() -> Self {
        Self::new()
    }
}

impl Database<WriteAheadLog> {
    /// Open the journal at `path`, replaying it to rebuild the indexes.
    ///
    /// Replayed timestamps are kept verbatim; the clock is moved past the
    /// largest one so new writes always sort after recovered ones.
    pub fn open(path: &Path, sync_mode: SyncMode) -> DbResult<Self> {
        let (journal, mutations) = WriteAheadLog::open(path, sync_mode)?;
        let clock = HybridClock::new();
        let mut state = MetadataState::new();
        let replayed = mutations.len();

        for mutation in mutations {
            if let Some(at) = mutation.timestamp() {
                clock.observe(at);
            }
            // Replay the same filter the live write path applied.
            if state.check(&mutation).is_ok() {
                state.apply(mutation);
            }
        }

        info!(path = %path.display(), replayed, "metadata journal replayed");
        Ok(Self {
            state: RwLock::new(state),
            clock,
            journal,
        })
    }
}

impl<J: Journal> Database<J> {
    fn read(&self) -> DbResult<RwLockReadGuard<'_, MetadataState>> {
        self.state
            .read()
            .map_err(|e| DbError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> DbResult<RwLockWriteGuard<'_, MetadataState>> {
        self.state
            .write()
            .map_err(|e| DbError::Unavailable(format!("lock poisoned: {e}")))
    }

    /// Check, journal and apply one mutation under the write lock.
    fn commit(&self, state: &mut MetadataState, mutation: Mutation) -> DbResult<()> {
        state.check(&mutation)?;
        self.journal.record(&mutation)?;
        state.apply(mutation);
        Ok(())
    }
}

impl<J: Journal> SpecStore for Database<J> {
    fn count_customer_models(&self, sub: &CustomerId) -> DbResult<u64> {
        Ok(self.read()?.count_customer_models(sub))
    }

    fn create_update_spec(
        &self,
        sub: &CustomerId,
        spec_id: &SpecId,
        meta: &SpecMetadata,
    ) -> DbResult<SpecRecord> {
        let mut state = self.write()?;
        let at = self.clock.now();
        self.commit(
            &mut state,
            Mutation::UpsertSpec {
                sub: sub.clone(),
                spec_id: spec_id.clone(),
                meta: meta.clone(),
                at,
            },
        )?;
        debug!(%spec_id, version = %meta.version, model_count = meta.model_count, "spec metadata stored");
        state.get_spec(sub, spec_id, &meta.version)
    }

    fn get_latest_version(&self, sub: &CustomerId, spec_id: &SpecId) -> DbResult<SpecVersion> {
        self.read()?.latest_version(sub, spec_id)
    }

    fn get_spec(
        &self,
        sub: &CustomerId,
        spec_id: &SpecId,
        version: &SpecVersion,
    ) -> DbResult<SpecRecord> {
        self.read()?.get_spec(sub, spec_id, version)
    }

    fn list_specs(&self, sub: &CustomerId) -> DbResult<Vec<SpecSummary>> {
        Ok(self.read()?.list_specs(sub))
    }

    fn list_spec_versions(&self, sub: &CustomerId, spec_id: &SpecId) -> DbResult<Vec<SpecSummary>> {
        self.read()?.list_spec_versions(sub, spec_id)
    }

    fn delete_spec(&self, sub: &CustomerId, spec_id: &SpecId) -> DbResult<()> {
        let mut state = self.write()?;
        self.commit(
            &mut state,
            Mutation::DeleteSpec {
                sub: sub.clone(),
                spec_id: spec_id.clone(),
            },
        )?;
        debug!(%spec_id, "spec metadata deleted");
        Ok(())
    }

    fn delete_all_specs(&self, sub: &CustomerId) -> DbResult<()> {
        let mut state = self.write()?;
        self.commit(&mut state, Mutation::DeleteAllSpecs { sub: sub.clone() })?;
        debug!("all spec metadata deleted for customer");
        Ok(())
    }
}

impl<J: Journal> CredentialStore for Database<J> {
    fn list_credentials(&self, sub: &CustomerId) -> DbResult<Vec<CredentialRecord>> {
        Ok(self.read()?.list_credentials(sub))
    }

    fn create_update_credential(
        &self,
        sub: &CustomerId,
        id: &CredentialId,
        credential: &NewCredential,
    ) -> DbResult<CredentialRecord> {
        let mut state = self.write()?;
        let at = self.clock.now();
        self.commit(
            &mut state,
            Mutation::UpsertCredential {
                sub: sub.clone(),
                id: id.clone(),
                credential: credential.clone(),
                at,
            },
        )?;
        debug!(credential_id = %id, "credential stored");
        state.get_credential(sub, id)
    }

    fn get_credential(&self, sub: &CustomerId, id: &CredentialId) -> DbResult<CredentialRecord> {
        self.read()?.get_credential(sub, id)
    }

    fn get_user(&self, public_key: &str) -> DbResult<CredentialAuthInfo> {
        self.read()?.get_user(public_key)
    }

    fn delete_credential(&self, sub: &CustomerId, id: &CredentialId) -> DbResult<()> {
        let mut state = self.write()?;
        self.commit(
            &mut state,
            Mutation::DeleteCredential {
                sub: sub.clone(),
                id: id.clone(),
            },
        )?;
        debug!(credential_id = %id, "credential deleted");
        Ok(())
    }

    fn delete_all_credentials(&self, sub: &CustomerId) -> DbResult<()> {
        let mut state = self.write()?;
        self.commit(&mut state, Mutation::DeleteAllCredentials { sub: sub.clone() })?;
        debug!("all credentials deleted for customer");
        Ok(())
    }
}

impl<J: Journal + std::fmt::Debug> std::fmt::Debug for Database<J> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("journal", &self.journal)
            .finish_non_exhaustive()
    }
}
