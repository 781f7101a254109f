use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Maximum length in bytes of any path-safe identifier.
pub const MAX_ID_LEN: usize = 128;

/// Hex characters per directory level of an encoded [`CustomerId`].
pub const PATH_CHUNK_LEN: usize = 128;

/// Validate that `value` can be used verbatim as a single path component.
///
/// Allowed characters are ASCII alphanumerics, `.`, `_` and `-`. The
/// special components `.` and `..` are rejected.
fn validate_segment(kind: &'static str, value: &str) -> Result<(), TypeError> {
    if value.is_empty() {
        return Err(TypeError::Empty { kind });
    }
    if value.len() > MAX_ID_LEN {
        return Err(TypeError::TooLong {
            kind,
            len: value.len(),
            max: MAX_ID_LEN,
        });
    }
    if value == "." || value == ".." {
        return Err(TypeError::InvalidCharacter {
            kind,
            value: value.to_string(),
            ch: '.',
        });
    }
    if let Some(ch) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(TypeError::InvalidCharacter {
            kind,
            value: value.to_string(),
            ch,
        });
    }
    Ok(())
}

macro_rules! path_safe_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap a raw identifier.
            pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
                let value = value.into();
                validate_segment($kind, &value)?;
                Ok(Self(value))
            }

            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl std::str::FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

path_safe_id!(
    /// Identifier of a spec within a customer's namespace.
    SpecId,
    "spec id"
);

path_safe_id!(
    /// Version of a spec, derived from the document content.
    SpecVersion,
    "spec version"
);

path_safe_id!(
    /// Customer-chosen identifier of a credential.
    CredentialId,
    "credential id"
);

/// The authenticated identity (`sub`) that owns specs and credentials.
///
/// Customer ids come from an identity provider and are not guaranteed to be
/// path-safe, so only emptiness is checked. Use [`CustomerId::to_path_components`]
/// when the id must appear in a filesystem path.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerId(String);

impl CustomerId {
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TypeError::Empty { kind: "customer id" });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex encoding of the id as one or more path components.
    ///
    /// The encoding is split into levels of at most [`PATH_CHUNK_LEN`]
    /// characters so long ids stay under file-name length limits. Every level
    /// but the last ends in `-`, which hex never produces, so one id's
    /// directory is never a prefix of another's.
    pub fn to_path_components(&self) -> Vec<String> {
        let encoded = hex::encode(self.0.as_bytes());
        let mut components = Vec::new();
        let mut rest = encoded.as_str();
        while rest.len() > PATH_CHUNK_LEN {
            let (head, tail) = rest.split_at(PATH_CHUNK_LEN);
            components.push(format!("{head}-"));
            rest = tail;
        }
        components.push(rest.to_string());
        components
    }

    /// Inverse of [`CustomerId::to_path_components`].
    pub fn from_path_components<'a>(
        components: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, TypeError> {
        let mut encoded = String::new();
        let mut components = components.into_iter().peekable();
        while let Some(component) = components.next() {
            let chunk = if components.peek().is_some() {
                component.strip_suffix('-').ok_or_else(|| {
                    TypeError::InvalidHex(format!("{component:?} is not an inner path level"))
                })?
            } else {
                component
            };
            encoded.push_str(chunk);
        }
        let bytes = hex::decode(&encoded).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let value = String::from_utf8(bytes).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<String> for CustomerId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CustomerId> for String {
    fn from(id: CustomerId) -> Self {
        id.0
    }
}

impl fmt::Debug for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomerId({})", self.0)
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_path_safe_ids() {
        for raw in ["abc", "my-spec_1.0", "v1", "A.B-C_D"] {
            assert!(SpecId::new(raw).is_ok(), "{raw} should be valid");
        }
    }

    #[test]
    fn rejects_empty_id() {
        assert_eq!(
            SpecVersion::new("").unwrap_err(),
            TypeError::Empty { kind: "spec version" }
        );
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(SpecId::new("..").is_err());
        assert!(SpecId::new(".").is_err());
        assert!(SpecId::new("a/b").is_err());
        assert!(SpecId::new("a\\b").is_err());
    }

    #[test]
    fn rejects_overlong_id() {
        let long = "x".repeat(MAX_ID_LEN + 1);
        assert!(matches!(
            CredentialId::new(long).unwrap_err(),
            TypeError::TooLong { len, .. } if len == MAX_ID_LEN + 1
        ));
        assert!(CredentialId::new("x".repeat(MAX_ID_LEN)).is_ok());
    }

    #[test]
    fn deserialize_validates() {
        let ok: SpecId = serde_json::from_str("\"pets\"").unwrap();
        assert_eq!(ok.as_str(), "pets");
        assert!(serde_json::from_str::<SpecId>("\"bad id\"").is_err());
    }

    #[test]
    fn customer_path_components_roundtrip() {
        let sub = CustomerId::new("auth0|user/42").unwrap();
        let components = sub.to_path_components();
        assert_eq!(components, vec![hex::encode("auth0|user/42")]);
        assert_eq!(
            CustomerId::from_path_components(components.iter().map(String::as_str)).unwrap(),
            sub
        );
    }

    #[test]
    fn long_customer_ids_are_split_into_short_levels() {
        let sub = CustomerId::new("x".repeat(300)).unwrap();
        let components = sub.to_path_components();
        assert_eq!(components.len(), 5);
        assert!(components.iter().all(|c| c.len() <= PATH_CHUNK_LEN + 1));
        assert!(components[..4].iter().all(|c| c.ends_with('-')));
        assert!(!components[4].ends_with('-'));
        assert_eq!(
            CustomerId::from_path_components(components.iter().map(String::as_str)).unwrap(),
            sub
        );
    }

    #[test]
    fn inner_level_without_separator_is_rejected() {
        assert!(CustomerId::from_path_components(["6161", "62"]).is_err());
    }

    #[test]
    fn customer_id_must_not_be_empty() {
        assert!(CustomerId::new("").is_err());
    }

    #[test]
    fn display_is_raw_value() {
        let id = SpecId::new("pets").unwrap();
        assert_eq!(id.to_string(), "pets");
        assert_eq!(format!("{id:?}"), "SpecId(pets)");
    }
}
