//! Content validation collaborator.
//!
//! The engine treats validation as an external collaborator behind a
//! trait so the surrounding system can swap in profanity filters or
//! moderation hooks without touching pairing logic.

/// Why a piece of content was rejected.
///
/// The display string is what the originating client sees in the `error`
/// event; nothing else observes a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Content is empty or whitespace-only.
    #[error("message cannot be empty")]
    Empty,

    /// Content exceeds the configured character limit.
    #[error("message too long ({len} characters, limit {max})")]
    TooLong {
        /// Character count of the rejected content.
        len: usize,
        /// Configured limit.
        max: usize,
    },
}

/// Content validation seam: `validate(text, max_len)`.
pub trait Validator: Send + Sync + 'static {
    /// Check `text` against the given character limit.
    fn validate(&self, text: &str, max_len: usize) -> Result<(), ValidationError>;
}

/// Default validator: rejects empty/whitespace-only and over-limit text.
///
/// Limits are counted in characters, not bytes, so multi-byte text gets
/// the same allowance clients display.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthValidator;

impl Validator for LengthValidator {
    fn validate(&self, text: &str, max_len: usize) -> Result<(), ValidationError> {
        if text.trim().is_empty() {
            return Err(ValidationError::Empty);
        }
        let len = text.chars().count();
        if len > max_len {
            return Err(ValidationError::TooLong { len, max: max_len });
        }
        Ok(())
    }
}
