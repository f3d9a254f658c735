//! Error types for canonmap

use thiserror::Error;

/// Every failure the hashing engine and the maps can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Please register object normalizers before hashing any value")]
    RegistrationLocked,

    #[error("Invalid prefix \"{0}\"")]
    InvalidPrefix(String),

    #[error("Key {0} is not defined")]
    KeyNotFound(String),

    #[error("Empty map")]
    EmptyMap,

    #[error("Type {0} is not supported")]
    UnsupportedShape(String),

    #[error("Value nesting exceeds the maximum depth of {0}")]
    DepthExceeded(usize),
}

impl Error {
    /// True for errors raised by normalizer registration: a late call or a
    /// malformed prefix. Neither leaves the hasher in a changed state.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::RegistrationLocked | Error::InvalidPrefix(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
