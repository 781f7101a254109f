//! HTTP server for the spec registry.
//!
//! Exposes the [`Registry`](specreg_registry::Registry) operations as a REST
//! API under `/v1`, authenticates callers through a pluggable
//! [`AuthProvider`], and maps registry outcomes onto HTTP statuses
//! (invalid spec or version 400, quota 402, missing 404, store faults 500).

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use auth::{AuthProvider, Caller, CredentialAuth, TrustedHeaderAuth};
pub use config::{AuthMode, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use handler::{
    CredentialResponse, IssuedCredentialResponse, SpecSummaryResponse, LANGUAGE_HEADER,
    VERSION_HEADER,
};
pub use router::{build_router, AppState};
pub use server::SpecregServer;
