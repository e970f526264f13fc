//! LLM Client error types.

use thiserror::Error;

/// Errors from building or driving an [`crate::LlmClient`].
#[derive(Debug, Error)]
pub enum LlmError {
    /// No credential was supplied for a provider that requires one.
    #[error("no API credential configured for provider {0}")]
    MissingCredential(String),

    /// The request could not be built or sent at all (DNS, TLS, connect).
    #[error("request to the LLM provider failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider responded with a non-2xx status.
    #[error("provider returned HTTP {status}: {body}")]
    Http {
        /// The HTTP status code.
        status: u16,
        /// The response body, if any.
        body: String,
    },

    /// An unknown provider tag was requested.
    #[error("unknown provider tag: {0}")]
    UnknownProvider(String),
}

/// Result type for LLM Client construction.
pub type LlmResult<T> = Result<T, LlmError>;
