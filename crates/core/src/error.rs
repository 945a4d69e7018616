//! Unified error types for sitefeed.
//!
//! Every variant renders with an upper-snake prefix so log lines and
//! HTTP error bodies can be grepped by failure kind.

use tokio_rusqlite::rusqlite;

/// Coarse failure classes used by adapters to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or incomplete site definition. Never retried.
    Config,
    /// Caller supplied bad input (bad key, bad URL in a request body).
    Input,
    /// The named object does not exist.
    NotFound,
    /// Page acquisition failed (network, status, decode, render).
    Acquisition,
    /// Storage backend failure.
    Storage,
}

/// Unified error types for the extraction engine, stores and acquisition.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Site definition failed structural validation.
    #[error("SDD_INVALID: {0}")]
    InvalidSdd(String),

    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No object stored under the given name.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP error response or transport failure.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// None of the candidate encodings produced usable text.
    #[error("DECODE_FAILED: {0}")]
    DecodeFailed(String),

    /// Headless rendering requested but not available.
    #[error("RENDER_DISABLED")]
    RenderDisabled,

    /// Render failed.
    #[error("RENDER_FAILED: {0}")]
    RenderFailed(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Filesystem operation failed.
    #[error("STORE_ERROR: {0}")]
    Io(#[from] std::io::Error),

    /// Stored object could not be (de)serialized.
    #[error("STORE_ERROR: malformed object: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Classify the error for adapters.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::InvalidSdd(_) => ErrorClass::Config,
            Error::InvalidInput(_) | Error::InvalidUrl(_) => ErrorClass::Input,
            Error::NotFound(_) => ErrorClass::NotFound,
            Error::FetchTimeout(_)
            | Error::FetchTooLarge(_)
            | Error::HttpError(_)
            | Error::DecodeFailed(_)
            | Error::RenderDisabled
            | Error::RenderFailed(_) => ErrorClass::Acquisition,
            Error::Database(_) | Error::MigrationFailed(_) | Error::Io(_) | Error::Serialization(_) => {
                ErrorClass::Storage
            }
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidSdd("missing field: url".to_string());
        assert!(err.to_string().starts_with("SDD_INVALID"));
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn test_error_class() {
        assert_eq!(Error::InvalidSdd("x".into()).class(), ErrorClass::Config);
        assert_eq!(Error::NotFound("x".into()).class(), ErrorClass::NotFound);
        assert_eq!(Error::FetchTimeout("x".into()).class(), ErrorClass::Acquisition);
        assert_eq!(Error::DecodeFailed("x".into()).class(), ErrorClass::Acquisition);
        assert_eq!(Error::RenderDisabled.class(), ErrorClass::Acquisition);
        assert_eq!(Error::InvalidUrl("x".into()).class(), ErrorClass::Input);
        assert_eq!(Error::MigrationFailed("x".into()).class(), ErrorClass::Storage);
    }

    #[test]
    fn test_io_error_converts() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.class(), ErrorClass::Storage);
        assert!(err.to_string().contains("STORE_ERROR"));
    }
}
