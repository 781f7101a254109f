//! In-memory indexes shared by every metadata backend.
//!
//! [`MetadataState`] holds the materialized view. Every change goes through a
//! [`Mutation`], which is what durable backends journal and replay.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use specreg_types::{CredentialId, CustomerId, SpecId, SpecVersion, Timestamp};

use crate::error::{DbError, DbResult};
use crate::model::{CredentialAuthInfo, CredentialRecord, NewCredential, SpecMetadata, SpecRecord};

/// A single state change, stamped with the time it was accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    UpsertSpec {
        sub: CustomerId,
        spec_id: SpecId,
        meta: SpecMetadata,
        at: Timestamp,
    },
    DeleteSpec {
        sub: CustomerId,
        spec_id: SpecId,
    },
    DeleteAllSpecs {
        sub: CustomerId,
    },
    UpsertCredential {
        sub: CustomerId,
        id: CredentialId,
        credential: NewCredential,
        at: Timestamp,
    },
    DeleteCredential {
        sub: CustomerId,
        id: CredentialId,
    },
    DeleteAllCredentials {
        sub: CustomerId,
    },
}

impl Mutation {
    /// Timestamp carried by the mutation, if any.
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::UpsertSpec { at, .. } | Self::UpsertCredential { at, .. } => Some(*at),
            _ => None,
        }
    }
}

/// Versions of one spec plus its latest-version pointer.
#[derive(Debug)]
struct SpecEntry {
    versions: HashMap<SpecVersion, SpecRecord>,
    latest: SpecVersion,
}

impl SpecEntry {
    fn latest_record(&self) -> Option<&SpecRecord> {
        self.versions.get(&self.latest)
    }
}

/// Materialized metadata for all customers.
#[derive(Debug, Default)]
pub struct MetadataState {
    specs: HashMap<CustomerId, BTreeMap<SpecId, SpecEntry>>,
    credentials: HashMap<CustomerId, BTreeMap<CredentialId, CredentialRecord>>,
    public_keys: HashMap<String, (CustomerId, CredentialId)>,
}

impl MetadataState {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Reject mutations that would violate an invariant. Nothing is changed.
    pub fn check(&self, mutation: &Mutation) -> DbResult<()> {
        if let Mutation::UpsertCredential {
            sub, id, credential, ..
        } = mutation
        {
            if let Some((owner, owner_id)) = self.public_keys.get(&credential.public_key) {
                if owner != sub || owner_id != id {
                    return Err(DbError::PublicKeyConflict {
                        public_key: credential.public_key.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Apply a mutation that has passed [`check`](Self::check).
    pub fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::UpsertSpec {
                sub,
                spec_id,
                meta,
                at,
            } => {
                self.upsert_spec(sub, spec_id, meta, at);
            }
            Mutation::DeleteSpec { sub, spec_id } => {
                if let Some(specs) = self.specs.get_mut(&sub) {
                    specs.remove(&spec_id);
                    if specs.is_empty() {
                        self.specs.remove(&sub);
                    }
                }
            }
            Mutation::DeleteAllSpecs { sub } => {
                self.specs.remove(&sub);
            }
            Mutation::UpsertCredential {
                sub,
                id,
                credential,
                at,
            } => {
                self.upsert_credential(sub, id, credential, at);
            }
            Mutation::DeleteCredential { sub, id } => {
                if let Some(creds) = self.credentials.get_mut(&sub) {
                    if let Some(old) = creds.remove(&id) {
                        self.public_keys.remove(&old.public_key);
                    }
                    if creds.is_empty() {
                        self.credentials.remove(&sub);
                    }
                }
            }
            Mutation::DeleteAllCredentials { sub } => {
                if let Some(creds) = self.credentials.remove(&sub) {
                    for cred in creds.values() {
                        self.public_keys.remove(&cred.public_key);
                    }
                }
            }
        }
    }

    /// Upsert one version and move the latest pointer to it if it is at
    /// least as recent as the current latest.
    pub fn upsert_spec(
        &mut self,
        sub: CustomerId,
        spec_id: SpecId,
        meta: SpecMetadata,
        at: Timestamp,
    ) -> SpecRecord {
        let specs = self.specs.entry(sub).or_default();
        let entry = specs.entry(spec_id.clone()).or_insert_with(|| SpecEntry {
            versions: HashMap::new(),
            latest: meta.version.clone(),
        });

        let created_at = entry
            .versions
            .get(&meta.version)
            .map(|existing| existing.created_at)
            .unwrap_or(at);
        let record = SpecRecord {
            spec_id,
            version: meta.version,
            title: meta.title,
            description: meta.description,
            model_count: meta.model_count,
            created_at,
            updated_at: at,
        };

        let newer = entry
            .latest_record()
            .map_or(true, |latest| !latest.updated_at.is_after(&at));
        if newer {
            entry.latest = record.version.clone();
        }
        entry.versions.insert(record.version.clone(), record.clone());
        record
    }

    /// Create or replace a credential, keeping the public-key index in step.
    pub fn upsert_credential(
        &mut self,
        sub: CustomerId,
        id: CredentialId,
        credential: NewCredential,
        at: Timestamp,
    ) -> CredentialRecord {
        let creds = self.credentials.entry(sub.clone()).or_default();
        let created_at = match creds.get(&id) {
            Some(old) => {
                self.public_keys.remove(&old.public_key);
                old.created_at
            }
            None => at,
        };
        let record = CredentialRecord {
            id: id.clone(),
            public_key: credential.public_key,
            secret_key_hash: credential.secret_key_hash,
            salt: credential.salt,
            created_at,
        };
        creds.insert(id.clone(), record.clone());
        self.public_keys
            .insert(record.public_key.clone(), (sub, id));
        record
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn count_customer_models(&self, sub: &CustomerId) -> u64 {
        self.specs.get(sub).map_or(0, |specs| {
            specs
                .values()
                .filter_map(SpecEntry::latest_record)
                .map(|r| r.model_count)
                .sum()
        })
    }

    fn entry(&self, sub: &CustomerId, spec_id: &SpecId) -> Option<&SpecEntry> {
        self.specs.get(sub).and_then(|specs| specs.get(spec_id))
    }

    pub fn latest_version(&self, sub: &CustomerId, spec_id: &SpecId) -> DbResult<SpecVersion> {
        self.entry(sub, spec_id)
            .map(|e| e.latest.clone())
            .ok_or_else(|| DbError::not_found("spec", spec_id.as_str()))
    }

    pub fn get_spec(
        &self,
        sub: &CustomerId,
        spec_id: &SpecId,
        version: &SpecVersion,
    ) -> DbResult<SpecRecord> {
        self.entry(sub, spec_id)
            .and_then(|e| e.versions.get(version))
            .cloned()
            .ok_or_else(|| DbError::not_found("spec version", format!("{spec_id}/{version}")))
    }

    pub fn list_specs(&self, sub: &CustomerId) -> Vec<SpecRecord> {
        self.specs.get(sub).map_or_else(Vec::new, |specs| {
            specs
                .values()
                .filter_map(SpecEntry::latest_record)
                .cloned()
                .collect()
        })
    }

    pub fn list_spec_versions(&self, sub: &CustomerId, spec_id: &SpecId) -> DbResult<Vec<SpecRecord>> {
        let entry = self
            .entry(sub, spec_id)
            .filter(|e| !e.versions.is_empty())
            .ok_or_else(|| DbError::not_found("spec", spec_id.as_str()))?;
        let mut versions: Vec<SpecRecord> = entry.versions.values().cloned().collect();
        versions.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.version.cmp(&b.version))
        });
        Ok(versions)
    }

    pub fn list_credentials(&self, sub: &CustomerId) -> Vec<CredentialRecord> {
        self.credentials
            .get(sub)
            .map_or_else(Vec::new, |creds| creds.values().cloned().collect())
    }

    pub fn get_credential(&self, sub: &CustomerId, id: &CredentialId) -> DbResult<CredentialRecord> {
        self.credentials
            .get(sub)
            .and_then(|creds| creds.get(id))
            .cloned()
            .ok_or_else(|| DbError::not_found("credential", id.as_str()))
    }

    pub fn get_user(&self, public_key: &str) -> DbResult<CredentialAuthInfo> {
        let (sub, id) = self
            .public_keys
            .get(public_key)
            .ok_or_else(|| DbError::not_found("public key", public_key))?;
        let record = self.get_credential(sub, id)?;
        Ok(CredentialAuthInfo {
            sub: sub.clone(),
            credential_id: id.clone(),
            secret_key_hash: record.secret_key_hash,
            salt: record.salt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(s: &str) -> CustomerId {
        CustomerId::new(s).unwrap()
    }

    fn spec(s: &str) -> SpecId {
        SpecId::new(s).unwrap()
    }

    fn meta(version: &str, models: u64) -> SpecMetadata {
        SpecMetadata {
            version: SpecVersion::new(version).unwrap(),
            model_count: models,
            title: None,
            description: None,
        }
    }

    #[test]
    fn older_write_does_not_move_latest_pointer() {
        let mut state = MetadataState::new();
        state.upsert_spec(sub("a"), spec("pets"), meta("2", 4), Timestamp::new(20, 0));
        state.upsert_spec(sub("a"), spec("pets"), meta("1", 1), Timestamp::new(10, 0));

        let latest = state.latest_version(&sub("a"), &spec("pets")).unwrap();
        assert_eq!(latest.as_str(), "2");
        assert_eq!(state.count_customer_models(&sub("a")), 4);
    }

    #[test]
    fn delete_credential_frees_public_key() {
        let mut state = MetadataState::new();
        let id = CredentialId::new("ci").unwrap();
        let cred = NewCredential {
            public_key: "pk_1".into(),
            secret_key_hash: "h".into(),
            salt: "s".into(),
        };
        state.upsert_credential(sub("a"), id.clone(), cred.clone(), Timestamp::new(1, 0));
        state.apply(Mutation::DeleteCredential {
            sub: sub("a"),
            id: id.clone(),
        });

        assert!(state.get_user("pk_1").unwrap_err().is_not_found());
        let reuse = Mutation::UpsertCredential {
            sub: sub("b"),
            id,
            credential: cred,
            at: Timestamp::new(2, 0),
        };
        assert!(state.check(&reuse).is_ok());
    }

    #[test]
    fn mutation_timestamp() {
        let upsert = Mutation::UpsertSpec {
            sub: sub("a"),
            spec_id: spec("x"),
            meta: meta("1", 1),
            at: Timestamp::new(5, 1),
        };
        assert_eq!(upsert.timestamp(), Some(Timestamp::new(5, 1)));
        assert_eq!(Mutation::DeleteAllSpecs { sub: sub("a") }.timestamp(), None);
    }
}
