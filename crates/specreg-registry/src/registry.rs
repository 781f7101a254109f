use std::sync::Arc;

use tracing::{debug, info, warn};

use specreg_crypto::{verify_secret, GeneratedCredential};
use specreg_db::{
    CredentialAuthInfo, CredentialInfo, CredentialRecord, InMemoryDatabase, MetadataStore,
    NewCredential, SpecMetadata, SpecSummary,
};
use specreg_quota::{LimitSource, QuotaPolicy};
use specreg_spec::{prepare, JsonSpecProcessor, SpecProcessor};
use specreg_store::{BlobStore, InMemoryBlobStore, StoreError};
use specreg_types::{CredentialId, CustomerId, Language, SpecId, SpecVersion};

use crate::error::{RegistryError, RegistryResult};

/// A credential freshly issued by [`Registry::issue_credential`].
///
/// `secret_key` is returned exactly once and never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedCredential {
    pub record: CredentialRecord,
    pub secret_key: String,
}

/// The spec registry.
///
/// Sequences the spec processor, the version check, the quota policy, the
/// blob store and the metadata store for writes, and serves reads straight
/// from the stores. Holds no per-request state; one instance is shared by
/// all requests.
pub struct Registry {
    processor: Arc<dyn SpecProcessor>,
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    quota: QuotaPolicy,
}

impl Registry {
    pub fn new(
        processor: Arc<dyn SpecProcessor>,
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        quota: QuotaPolicy,
    ) -> Self {
        Self {
            processor,
            blobs,
            metadata,
            quota,
        }
    }

    /// A registry over the JSON processor and in-memory stores.
    pub fn in_memory(limit: impl LimitSource + 'static) -> Self {
        Self::new(
            Arc::new(JsonSpecProcessor::new()),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(InMemoryDatabase::new()),
            QuotaPolicy::new(limit),
        )
    }

    pub fn quota(&self) -> &QuotaPolicy {
        &self.quota
    }

    // ---- Spec writes ----

    /// Validate and store one version of a spec.
    ///
    /// Runs strictly in order, stopping at the first failure:
    ///
    /// 1. process the document (`Validation`)
    /// 2. compare the requested version with the derived one (`VersionMismatch`)
    /// 3. check the quota (`QuotaExceeded`)
    /// 4. write the canonical body to the blob store (`Storage`)
    /// 5. write the metadata (`Database`)
    ///
    /// Nothing is stored when steps 1-3 fail. If step 5 fails the blob is
    /// left in place; both writes are upserts on the same key, so retrying
    /// the same upload reconciles the stores.
    pub fn put_version(
        &self,
        sub: &CustomerId,
        spec_id: &SpecId,
        version: &SpecVersion,
        body: &[u8],
        language: Language,
    ) -> RegistryResult<()> {
        let info = self.processor.process(body, language)?;

        if &info.version != version {
            warn!(%spec_id, declared = %version, derived = %info.version, "spec version mismatch");
            return Err(RegistryError::VersionMismatch {
                declared: version.clone(),
                derived: info.version,
            });
        }

        let decision = self
            .quota
            .check_would_exceed(&*self.metadata, sub, info.model_count)?;
        if decision.exceeded {
            warn!(
                %spec_id,
                %version,
                model_count = info.model_count,
                current = decision.current,
                ceiling = decision.ceiling,
                "spec rejected by quota"
            );
            let reason = decision.reason.unwrap_or_default();
            return Err(RegistryError::QuotaExceeded(reason));
        }

        self.blobs
            .put(sub, spec_id, &info.version, &info.spec_str)
            .map_err(RegistryError::Storage)?;

        if let Err(e) = self
            .metadata
            .create_update_spec(sub, spec_id, &SpecMetadata::from(&info))
        {
            warn!(
                %spec_id,
                %version,
                error = %e,
                "spec document stored but metadata write failed; a retry of the upload reconciles"
            );
            return Err(RegistryError::Database(e));
        }

        info!(%spec_id, %version, model_count = info.model_count, "spec version stored");
        Ok(())
    }

    // ---- Spec reads ----

    /// The stored document of one version, with its version re-inserted.
    pub fn get_version(
        &self,
        sub: &CustomerId,
        spec_id: &SpecId,
        version: &SpecVersion,
    ) -> RegistryResult<String> {
        let stored = self.blobs.get(sub, spec_id, version)?;
        prepare(&stored, version).map_err(|e| {
            RegistryError::Storage(StoreError::CorruptEntry {
                path: format!("{spec_id}/{version}"),
                reason: e.to_string(),
            })
        })
    }

    /// The latest version of a spec and its document.
    pub fn get_latest(
        &self,
        sub: &CustomerId,
        spec_id: &SpecId,
    ) -> RegistryResult<(SpecVersion, String)> {
        let version = self.metadata.get_latest_version(sub, spec_id)?;
        let body = self.get_version(sub, spec_id, &version)?;
        Ok((version, body))
    }

    /// Every version of a spec, most recent first. `NotFound` if there are none.
    pub fn list_versions(
        &self,
        sub: &CustomerId,
        spec_id: &SpecId,
    ) -> RegistryResult<Vec<SpecSummary>> {
        Ok(self.metadata.list_spec_versions(sub, spec_id)?)
    }

    /// The latest version of each of the customer's specs.
    pub fn list_specs(&self, sub: &CustomerId) -> RegistryResult<Vec<SpecSummary>> {
        Ok(self.metadata.list_specs(sub)?)
    }

    // ---- Spec deletes ----

    /// Delete every version of a spec. Metadata goes first so it never
    /// points at a missing document.
    pub fn delete_spec(&self, sub: &CustomerId, spec_id: &SpecId) -> RegistryResult<()> {
        self.metadata.delete_spec(sub, spec_id)?;
        self.blobs.delete_spec(sub, spec_id)?;
        info!(%spec_id, "spec deleted");
        Ok(())
    }

    pub fn delete_all_specs(&self, sub: &CustomerId) -> RegistryResult<()> {
        self.metadata.delete_all_specs(sub)?;
        self.blobs.delete_all(sub)?;
        info!("all specs deleted");
        Ok(())
    }

    // ---- Credentials ----

    pub fn list_credentials(&self, sub: &CustomerId) -> RegistryResult<Vec<CredentialInfo>> {
        Ok(self.metadata.list_credentials(sub)?)
    }

    /// Store caller-provided key material under `(sub, id)`.
    pub fn create_update_credential(
        &self,
        sub: &CustomerId,
        id: &CredentialId,
        credential: &NewCredential,
    ) -> RegistryResult<CredentialInfo> {
        Ok(self.metadata.create_update_credential(sub, id, credential)?)
    }

    /// Generate fresh key material for `(sub, id)`, replacing any existing
    /// credential with that id.
    pub fn issue_credential(
        &self,
        sub: &CustomerId,
        id: &CredentialId,
    ) -> RegistryResult<IssuedCredential> {
        let generated = GeneratedCredential::generate();
        let record = self.metadata.create_update_credential(
            sub,
            id,
            &NewCredential {
                public_key: generated.public_key,
                secret_key_hash: generated.secret_key_hash,
                salt: generated.salt,
            },
        )?;
        info!(credential_id = %id, public_key = %record.public_key, "credential issued");
        Ok(IssuedCredential {
            record,
            secret_key: generated.secret_key,
        })
    }

    pub fn get_credential(
        &self,
        sub: &CustomerId,
        id: &CredentialId,
    ) -> RegistryResult<CredentialInfo> {
        Ok(self.metadata.get_credential(sub, id)?)
    }

    pub fn delete_credential(&self, sub: &CustomerId, id: &CredentialId) -> RegistryResult<()> {
        self.metadata.delete_credential(sub, id)?;
        debug!(credential_id = %id, "credential deleted");
        Ok(())
    }

    pub fn delete_all_credentials(&self, sub: &CustomerId) -> RegistryResult<()> {
        Ok(self.metadata.delete_all_credentials(sub)?)
    }

    /// Resolve a public key to its owner. `NotFound` if the key is unknown.
    pub fn get_user(&self, public_key: &str) -> RegistryResult<CredentialAuthInfo> {
        Ok(self.metadata.get_user(public_key)?)
    }

    /// Check a `(public_key, secret_key)` pair.
    ///
    /// Returns the owning customer, or `None` if the key is unknown or the
    /// secret does not match.
    pub fn authenticate(
        &self,
        public_key: &str,
        secret_key: &str,
    ) -> RegistryResult<Option<CustomerId>> {
        let auth = match self.metadata.get_user(public_key) {
            Ok(auth) => auth,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if verify_secret(secret_key, &auth.salt, &auth.secret_key_hash)? {
            Ok(Some(auth.sub))
        } else {
            debug!(public_key, "secret key mismatch");
            Ok(None)
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}
