//! Error types for the public API.
//!
//! Internally everything is an `anyhow::Error` (see `Res`). At the public boundary an error is
//! tagged with an `ErrorType` so callers can tell a misconfigured store apart from a store that
//! failed while doing IO.

use std::error::Error as StdError;
use std::fmt::{Debug, Display, Formatter};

/// The internal result type.
pub type Res<T> = anyhow::Result<T>;

/// The public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies a public error.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The home directory, config file or store credentials are missing or invalid. Nothing else
    /// can run until this is fixed.
    Config,
    /// A configured store failed to load or append.
    Store,
    /// A new transaction or command argument was malformed.
    Request,
    /// A report or export could not be written to its destination.
    Output,
}

serde_plain::derive_display_from_serialize!(ErrorType);

/// An error returned by the public API.
pub struct Error {
    error_type: ErrorType,
    source: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, source: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            source: source.into(),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.source)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // The alternate form prints the whole context chain.
        write!(f, "{} error: {:#}", self.error_type, self.source)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Converts an internal `anyhow` result into a public `Result`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Res<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}
