//! Blob storage for the spec registry.
//!
//! Every accepted spec document is stored as an opaque byte string under the
//! key `(customer, spec id, version)`. The store never interprets document
//! contents; validation and canonicalization happen before a document
//! reaches it.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsBlobStore`] -- one file per version under a root directory
//!
//! # Design Rules
//!
//! 1. `put` is an upsert: writing the same key twice leaves one document.
//! 2. A missing key is [`StoreError::NotFound`], distinguishable from I/O faults.
//! 3. Deletes are idempotent.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use traits::{BlobKey, BlobStore};
