//! Error types for veles-common.

use thiserror::Error;

/// Common error type for cursor-level operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer: needed {needed} bytes but only {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// An 80-bit extended float whose exponent cannot be represented as f64.
    #[error("80-bit float exponent {exponent} out of f64 range")]
    FloatOutOfRange { exponent: i32 },
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
