//! Error types for the SAML2Map core library.
//!
//! Each subsystem has its own error type derived with `thiserror`. The
//! backend wraps store failures so callers of `authenticate` see one type.
//!
//! Note that attribute mapping itself never fails: missing targets and empty
//! value lists are skipped, not reported.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Mapping input errors
// ---------------------------------------------------------------------------

/// Errors from loading attribute mappings or asserted attributes.
#[derive(Debug, Error)]
pub enum MappingError {
    /// An input file could not be read.
    #[error("attribute file error at '{path}': {detail}")]
    FileError {
        path: String,
        detail: String,
    },

    /// JSON or TOML parse failure.
    #[error("attribute parse error: {0}")]
    ParseError(String),

    /// Generic I/O error.
    #[error("attribute I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// User store errors
// ---------------------------------------------------------------------------

/// Errors from a [`UserStore`](crate::store::UserStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A user with the same main attribute value already exists.
    #[error("user with {field} = '{value}' already exists")]
    Duplicate {
        field: String,
        value: String,
    },

    /// The user to save has no primary key or is unknown to the store.
    #[error("user not found: {0}")]
    NotFound(String),

    /// The field used for lookup does not exist on the user model.
    #[error("unknown lookup field '{0}'")]
    UnknownField(String),
}

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// Errors from the authentication backend facade.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Underlying store failure.
    #[error("backend store error: {0}")]
    StoreError(#[from] StoreError),

    /// The main attribute could not be set on a freshly created user.
    #[error("main attribute '{0}' is not a field of the active user model")]
    MainAttributeNotSettable(String),
}
