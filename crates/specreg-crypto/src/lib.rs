//! Cryptographic primitives for the spec registry.
//!
//! Provides domain-separated BLAKE3 hashing (used to fingerprint spec
//! documents that carry no explicit version) and generation/verification of
//! credential secrets.
//!
//! All crypto operations wrap established libraries. There is no custom cryptography.

pub mod credentials;
pub mod hasher;

pub use credentials::{hash_secret, verify_secret, GeneratedCredential, SecretError};
pub use hasher::ContentHasher;
