//! Configuration error types.

use thiserror::Error;

/// Errors from loading or resolving configuration. Fatal at construction —
/// the caller should surface these before an engine is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read a config file.
    #[error("could not read {path}: {source}")]
    Io {
        /// The path that failed to read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A config file's contents did not parse as JSON.
    #[error("malformed JSON in {path}: {source}")]
    Json {
        /// The path that failed to parse.
        path: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A config file's contents did not parse as TOML.
    #[error("malformed TOML in {path}: {source}")]
    Toml {
        /// The path that failed to parse.
        path: String,
        /// The underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// An unrecognized provider tag was requested.
    #[error("unknown provider tag: {0}")]
    UnknownProvider(String),

    /// No platform config directory could be determined (e.g. no `$HOME`).
    #[error("could not determine a config directory for this platform")]
    NoConfigDir,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
