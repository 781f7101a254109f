/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"specreg-spec-version-v1"`) that
/// is prepended to every hash computation, so a spec fingerprint and a
/// credential secret hash over identical bytes never collide.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for spec version fingerprints.
    pub const SPEC_VERSION: Self = Self {
        domain: "specreg-spec-version-v1",
    };
    /// Hasher for credential secret keys.
    pub const CREDENTIAL_SECRET: Self = Self {
        domain: "specreg-credential-secret-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        hasher.finalize()
    }

    /// Hash several parts, each length-prefixed so part boundaries are
    /// unambiguous (`["ab", "c"]` and `["a", "bc"]` hash differently).
    pub fn hash_parts(&self, parts: &[&[u8]]) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        hasher.finalize()
    }

    /// Hex-encoded hash truncated to `len` characters (at most 64).
    pub fn short_hex(&self, data: &[u8], len: usize) -> String {
        let mut hex = self.hash(data).to_hex().to_string();
        hex.truncate(len.min(64));
        hex
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"openapi document";
        assert_eq!(
            ContentHasher::SPEC_VERSION.hash(data),
            ContentHasher::SPEC_VERSION.hash(data)
        );
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        assert_ne!(
            ContentHasher::SPEC_VERSION.hash(data),
            ContentHasher::CREDENTIAL_SECRET.hash(data)
        );
    }

    #[test]
    fn parts_are_length_prefixed() {
        let h = ContentHasher::CREDENTIAL_SECRET;
        assert_ne!(h.hash_parts(&[b"ab", b"c"]), h.hash_parts(&[b"a", b"bc"]));
    }

    #[test]
    fn short_hex_truncates() {
        let short = ContentHasher::SPEC_VERSION.short_hex(b"data", 20);
        assert_eq!(short.len(), 20);
        assert!(short.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ContentHasher::SPEC_VERSION.short_hex(b"data", 500).len(), 64);
    }

    #[test]
    fn custom_domain() {
        let custom = ContentHasher::new("my-custom-domain-v1");
        assert_eq!(custom.domain(), "my-custom-domain-v1");
        assert_ne!(custom.hash(b"data"), ContentHasher::SPEC_VERSION.hash(b"data"));
    }
}
