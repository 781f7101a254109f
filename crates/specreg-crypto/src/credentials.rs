//! Credential key material.
//!
//! A credential is a `(public_key, secret_key)` pair. Only the public key, a
//! random salt, and a salted hash of the secret key are ever stored; the
//! secret key is shown to the customer once, when the credential is issued.

use rand::Rng;

use crate::hasher::ContentHasher;

const PUBLIC_KEY_PREFIX: &str = "pk_";
const SECRET_KEY_PREFIX: &str = "sk_";
const PUBLIC_KEY_BYTES: usize = 16;
const SECRET_KEY_BYTES: usize = 32;
const SALT_BYTES: usize = 16;

/// Errors from secret verification.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("stored secret hash is not valid hex: {0}")]
    MalformedHash(String),
}

/// Freshly generated credential material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedCredential {
    pub public_key: String,
    /// Plaintext secret. Never persisted.
    pub secret_key: String,
    pub salt: String,
    pub secret_key_hash: String,
}

impl GeneratedCredential {
    /// Generate a new random credential.
    pub fn generate() -> Self {
        let public_key = format!("{PUBLIC_KEY_PREFIX}{}", random_hex(PUBLIC_KEY_BYTES));
        let secret_key = format!("{SECRET_KEY_PREFIX}{}", random_hex(SECRET_KEY_BYTES));
        let salt = random_hex(SALT_BYTES);
        let secret_key_hash = hash_secret(&secret_key, &salt);
        Self {
            public_key,
            secret_key,
            salt,
            secret_key_hash,
        }
    }
}

/// Salted, domain-separated hash of a secret key, hex encoded.
pub fn hash_secret(secret_key: &str, salt: &str) -> String {
    ContentHasher::CREDENTIAL_SECRET
        .hash_parts(&[salt.as_bytes(), secret_key.as_bytes()])
        .to_hex()
        .to_string()
}

/// Check a presented secret key against a stored hash and salt.
///
/// The comparison is constant-time (`blake3::Hash` equality).
pub fn verify_secret(secret_key: &str, salt: &str, stored_hash: &str) -> Result<bool, SecretError> {
    let stored = blake3::Hash::from_hex(stored_hash)
        .map_err(|e| SecretError::MalformedHash(e.to_string()))?;
    let presented = ContentHasher::CREDENTIAL_SECRET.hash_parts(&[salt.as_bytes(), secret_key.as_bytes()]);
    Ok(presented == stored)
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_credential_shape() {
        let cred = GeneratedCredential::generate();
        assert!(cred.public_key.starts_with("pk_"));
        assert_eq!(cred.public_key.len(), 3 + PUBLIC_KEY_BYTES * 2);
        assert!(cred.secret_key.starts_with("sk_"));
        assert_eq!(cred.salt.len(), SALT_BYTES * 2);
        assert_eq!(cred.secret_key_hash.len(), 64);
    }

    #[test]
    fn generated_credentials_are_unique() {
        let a = GeneratedCredential::generate();
        let b = GeneratedCredential::generate();
        assert_ne!(a.public_key, b.public_key);
        assert_ne!(a.secret_key, b.secret_key);
        assert_ne!(a.salt, b.salt);
    }

    #[test]
    fn verify_accepts_correct_secret() {
        let cred = GeneratedCredential::generate();
        assert!(verify_secret(&cred.secret_key, &cred.salt, &cred.secret_key_hash).unwrap());
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let cred = GeneratedCredential::generate();
        assert!(!verify_secret("sk_wrong", &cred.salt, &cred.secret_key_hash).unwrap());
    }

    #[test]
    fn verify_rejects_wrong_salt() {
        let cred = GeneratedCredential::generate();
        assert!(!verify_secret(&cred.secret_key, "00", &cred.secret_key_hash).unwrap());
    }

    #[test]
    fn verify_reports_malformed_hash() {
        assert!(matches!(
            verify_secret("sk_x", "00", "not-hex"),
            Err(SecretError::MalformedHash(_))
        ));
    }

    #[test]
    fn hash_depends_on_salt() {
        assert_ne!(hash_secret("sk_same", "aa"), hash_secret("sk_same", "bb"));
    }
}
