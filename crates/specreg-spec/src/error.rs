use thiserror::Error;

/// Reasons an uploaded document is rejected by a spec processor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("the spec is not valid UTF-8: {0}")]
    NotUtf8(String),

    #[error("the spec is not valid {language}: {reason}")]
    Parse { language: String, reason: String },

    #[error("{0} specs are not supported by this processor")]
    UnsupportedLanguage(String),

    #[error("the spec must be an object")]
    NotAnObject,

    #[error("the spec must define components.schemas as an object")]
    MissingSchemas,

    #[error("schema {name} must be an object")]
    SchemaNotObject { name: String },

    #[error("schema {name}: {reason}")]
    InvalidSchema { name: String, reason: String },

    #[error("the spec does not define any models")]
    NoModels,

    #[error("the spec version {version:?} is invalid: {reason}")]
    InvalidVersion { version: String, reason: String },
}

pub type SpecResult<T> = Result<T, SpecError>;
