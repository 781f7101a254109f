//! Foundation types for the spec registry.
//!
//! This crate provides the identifier, temporal, and processed-spec types used
//! throughout the registry. Every other `specreg` crate depends on
//! `specreg-types`.
//!
//! # Key Types
//!
//! - [`CustomerId`]: The authenticated identity (`sub`) owning specs and credentials
//! - [`SpecId`] / [`SpecVersion`]: Path-safe identifiers for a spec and one of its versions
//! - [`CredentialId`]: Customer-chosen name for a credential
//! - [`Timestamp`]: Hybrid logical timestamp used to order writes
//! - [`HybridClock`]: Monotonic source of [`Timestamp`] values
//! - [`SpecInfo`]: Output of the spec processor for one document
//! - [`Language`]: Declared source language of an uploaded document

pub mod error;
pub mod ids;
pub mod spec;
pub mod temporal;

pub use error::TypeError;
pub use ids::{CredentialId, CustomerId, SpecId, SpecVersion, MAX_ID_LEN, PATH_CHUNK_LEN};
pub use spec::{Language, SpecInfo};
pub use temporal::{HybridClock, Timestamp};
