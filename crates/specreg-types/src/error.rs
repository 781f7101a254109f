use thiserror::Error;

/// Errors produced when constructing or parsing foundation types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} is too long: {len} bytes (max {max})")]
    TooLong {
        kind: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{kind} {value:?} contains invalid character {ch:?}")]
    InvalidCharacter {
        kind: &'static str,
        value: String,
        ch: char,
    },

    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("invalid hex string: {0}")]
    InvalidHex(String),
}
