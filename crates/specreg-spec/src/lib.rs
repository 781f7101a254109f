//! Spec processing for the spec registry.
//!
//! The registry treats spec validation as an opaque function: given raw
//! document bytes and a declared [`Language`](specreg_types::Language), a
//! [`SpecProcessor`] either returns a [`SpecInfo`](specreg_types::SpecInfo)
//! (canonical version, model count, title, description, canonical body) or
//! fails with a [`SpecError`].
//!
//! # Processors
//!
//! - [`JsonSpecProcessor`]: reference processor for JSON OpenAPI documents
//!   whose models are marked with `x-tablename` / `x-inherits`
//!
//! [`prepare`] is the read-side counterpart: it re-inserts the version into a
//! stored canonical body before it is returned to a client.

pub mod error;
pub mod json;
pub mod processor;

pub use error::{SpecError, SpecResult};
pub use json::{prepare, JsonSpecProcessor, VERSION_HASH_LEN};
pub use processor::SpecProcessor;
