//! Error types for key operations.

use thiserror::Error;

/// Errors that can occur while producing or decoding key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The key text is not standard base64.
    #[error("key is not valid base64: {0}")]
    InvalidBase64(String),

    /// The key decodes to the wrong number of bytes.
    #[error("key must decode to 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// The external key tool could not be run or reported failure.
    #[error("`{command}` failed: {message}")]
    Tool {
        /// The command line that was run.
        command: String,
        /// What went wrong.
        message: String,
    },
}
