//! Quota policy for the spec registry.
//!
//! The free tier caps the total number of models a customer stores, counted
//! over the latest version of each spec. [`QuotaPolicy`] compares that count
//! plus the models of an incoming spec against a ceiling resolved from a
//! [`LimitSource`] on every check, and returns a [`QuotaDecision`] carrying
//! the user-facing reason.

pub mod error;
pub mod limit;
pub mod policy;

pub use error::{QuotaError, QuotaResult};
pub use limit::{
    EnvLimit, LimitSource, SharedLimit, DEFAULT_FREE_TIER_MODEL_COUNT, FREE_TIER_ENV,
};
pub use policy::{QuotaDecision, QuotaPolicy};
