//! Records held by the metadata store.

use serde::{Deserialize, Serialize};

use specreg_types::{CredentialId, CustomerId, SpecId, SpecInfo, SpecVersion, Timestamp};

/// Metadata written for one spec version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecMetadata {
    pub version: SpecVersion,
    pub model_count: u64,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl From<&SpecInfo> for SpecMetadata {
    fn from(info: &SpecInfo) -> Self {
        Self {
            version: info.version.clone(),
            model_count: info.model_count,
            title: info.title.clone(),
            description: info.description.clone(),
        }
    }
}

/// One stored version of a spec.
///
/// `created_at` is set by the first write of the version and preserved by
/// later upserts; `updated_at` advances on every write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRecord {
    pub spec_id: SpecId,
    pub version: SpecVersion,
    pub title: Option<String>,
    pub description: Option<String>,
    pub model_count: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// List element returned by spec and version listings.
pub type SpecSummary = SpecRecord;

/// Key material written for a credential. The secret itself is never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCredential {
    pub public_key: String,
    pub secret_key_hash: String,
    pub salt: String,
}

/// A stored credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: CredentialId,
    pub public_key: String,
    pub secret_key_hash: String,
    pub salt: String,
    pub created_at: Timestamp,
}

/// Credential view returned by list and get.
pub type CredentialInfo = CredentialRecord;

/// What authentication needs after resolving a public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAuthInfo {
    pub sub: CustomerId,
    pub credential_id: CredentialId,
    pub secret_key_hash: String,
    pub salt: String,
}
