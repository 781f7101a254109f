//! Metadata store for the spec registry.
//!
//! Maps `(customer, spec id, version)` to spec metadata and
//! `(customer, credential id)` to credential records. A latest-version
//! pointer per spec is maintained as an explicit index, updated under the
//! same lock as the version write, so `get_latest_version`, `list_specs` and
//! quota counting never scan version history.
//!
//! # Modules
//!
//! - [`error`]: [`DbError`] and the [`DbResult`] alias
//! - [`model`]: stored records ([`SpecRecord`], [`CredentialRecord`], ...)
//! - [`traits`]: the [`SpecStore`], [`CredentialStore`] and [`MetadataStore`] interfaces
//! - [`state`]: shared in-memory indexes and the [`Mutation`] log record
//! - [`journal`]: [`WriteAheadLog`] (length + CRC32 framed, bincode encoded)
//! - [`database`]: [`InMemoryDatabase`] and the durable [`WalDatabase`]
//!
//! # Quota counting
//!
//! `count_customer_models` sums the latest version of each spec only, so
//! keeping revision history never counts against the free tier.

pub mod database;
pub mod error;
pub mod journal;
pub mod model;
pub mod state;
pub mod traits;

pub use database::{Database, InMemoryDatabase, WalDatabase};
pub use error::{DbError, DbResult};
pub use journal::{Journal, NoJournal, SyncMode, WriteAheadLog};
pub use model::{
    CredentialAuthInfo, CredentialInfo, CredentialRecord, NewCredential, SpecMetadata, SpecRecord,
    SpecSummary,
};
pub use state::{MetadataState, Mutation};
pub use traits::{CredentialStore, MetadataStore, SpecStore};
