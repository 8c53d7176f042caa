//! Error types for licitacoes-core.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading the record set.
///
/// All of these are fatal at startup: without records every query would
/// silently return an empty result.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// The dataset file could not be read.
    #[error("failed to read dataset {path}: {source}")]
    Read {
        /// Path that was being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The dataset file is not a JSON array of objects.
    #[error("dataset {path} is not a JSON array of records: {source}")]
    Parse {
        /// Path that was being parsed.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// No dataset path was configured.
    #[error("no dataset configured. Set `dataset` in the config file or pass --dataset")]
    NotConfigured,
}

/// Result type alias using [`DatasetError`].
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors raised by caller-level query validation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    /// Neither search term was supplied.
    #[error("missing search terms. Provide at least one of `orgao` or `objeto`")]
    NoTerms,

    /// The strict search path requires both terms.
    #[error("missing search terms. Both `orgao` and `objeto` are required")]
    MissingTerms,

    /// Unknown table sort mode.
    #[error("unknown sort mode: {name}. Use: {available}")]
    UnknownSort {
        /// The sort mode that was requested.
        name: String,
        /// Comma-separated list of available sort modes.
        available: String,
    },
}

/// Result type alias using [`QueryError`].
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors from the external narrative generator.
///
/// These never abort an analysis; they are folded into the narrative
/// section of the response as an error indicator.
#[derive(Error, Debug)]
pub enum NarrativeError {
    /// No generator is available (disabled, or no API key).
    #[error("narrative generator not configured; report unavailable")]
    NotConfigured,

    /// The payload could not be serialized for the prompt.
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Transport-level failure talking to the generator.
    #[error("narrative request failed: {0}")]
    Transport(String),

    /// The generator answered with a non-success status.
    #[error("narrative service returned {status}: {body}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// The generator answered without any text candidate.
    #[error("narrative service returned no text")]
    EmptyResponse,
}

#[cfg(feature = "gemini")]
impl From<reqwest::Error> for NarrativeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Result type alias using [`NarrativeError`].
pub type NarrativeResult<T> = Result<T, NarrativeError>;
