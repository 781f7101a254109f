use specreg_types::{Language, SpecInfo};

use crate::error::SpecResult;

/// Validates an uploaded document and derives its registry metadata.
///
/// Implementations must be pure with respect to the registry: they never
/// touch a store, so a failed validation leaves no trace.
pub trait SpecProcessor: Send + Sync {
    /// Parse and validate `body`, declared to be written in `language`.
    fn process(&self, body: &[u8], language: Language) -> SpecResult<SpecInfo>;
}
