//! The failure types flowing through the dispatch pipeline.
//!
//! Handlers and middleware return `Result<(), Error>`. An [`Error::Http`]
//! carries an [`HttpError`] whose status and message the error translator
//! writes verbatim; every other failure travels as [`Error::Internal`] and
//! is translated to `500 Internal Server Error`.
//!
//! ```rust
//! use ruta::{Context, Error, HttpError};
//!
//! async fn get_user(c: Context) -> Result<(), Error> {
//!     let id = c.param("id");
//!     if id.is_empty() {
//!         return Err(HttpError::bad_request().into());
//!     }
//!     Err(HttpError::not_found()
//!         .with_message("no such user")
//!         .into())
//! }
//! ```

use std::fmt;

use thiserror::Error as ThisError;

use crate::status::Status;

/// A boxed, transferable error used for wrapped causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ── HttpError ─────────────────────────────────────────────────────────────────

/// A typed HTTP-level failure asserted by a handler or middleware.
///
/// Carries the status to send, a user-facing message (defaulting to the
/// status reason phrase), and optionally the internal cause for diagnostics.
/// The wrapped cause never changes what goes on the wire.
#[derive(Debug)]
pub struct HttpError {
    status: Status,
    message: String,
    source: Option<BoxError>,
}

impl HttpError {
    /// A failure with the given status and its default reason phrase.
    pub fn new(status: Status) -> Self {
        Self {
            status,
            message: status.reason().to_owned(),
            source: None,
        }
    }

    /// Replaces the user-facing message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attaches the internal cause, kept out of the response body.
    pub fn wrap(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    // ── Standard failures ─────────────────────────────────────────────────────

    /// `400 Bad Request`
    pub fn bad_request() -> Self {
        Self::new(Status::BadRequest)
    }

    /// `401 Unauthorized`
    pub fn unauthorized() -> Self {
        Self::new(Status::Unauthorized)
    }

    /// `403 Forbidden`
    pub fn forbidden() -> Self {
        Self::new(Status::Forbidden)
    }

    /// `404 Not Found`
    pub fn not_found() -> Self {
        Self::new(Status::NotFound)
    }

    /// `405 Method Not Allowed`
    pub fn method_not_allowed() -> Self {
        Self::new(Status::MethodNotAllowed)
    }

    /// `408 Request Timeout`
    pub fn request_timeout() -> Self {
        Self::new(Status::RequestTimeout)
    }

    /// `415 Unsupported Media Type`
    pub fn unsupported_media_type() -> Self {
        Self::new(Status::UnsupportedMediaType)
    }

    /// `429 Too Many Requests`
    pub fn too_many_requests() -> Self {
        Self::new(Status::TooManyRequests)
    }

    /// `500 Internal Server Error`
    pub fn internal() -> Self {
        Self::new(Status::InternalServerError)
    }

    /// `502 Bad Gateway`
    pub fn bad_gateway() -> Self {
        Self::new(Status::BadGateway)
    }

    /// `503 Service Unavailable`
    pub fn service_unavailable() -> Self {
        Self::new(Status::ServiceUnavailable)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code={}, message={}", self.status.code(), self.message)
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as _)
    }
}

// ── Error ─────────────────────────────────────────────────────────────────────

/// The error type returned through the dispatch pipeline.
#[derive(Debug, ThisError)]
pub enum Error {
    /// An intentional HTTP failure; translated to its own status and message.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Anything else; always translated to a 500.
    #[error("{0}")]
    Internal(#[source] BoxError),
}

impl Error {
    /// Wraps an arbitrary failure as [`Error::Internal`].
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Internal(err.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(Box::new(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_message_is_reason_phrase() {
        let err = HttpError::not_found();
        assert_eq!(err.status(), Status::NotFound);
        assert_eq!(err.message(), "Not Found");
    }

    #[test]
    fn display_matches_code_and_message() {
        let err = HttpError::bad_request().with_message("missing id");
        assert_eq!(err.to_string(), "code=400, message=missing id");
    }

    #[test]
    fn wrapped_cause_does_not_change_message() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer gone");
        let err = HttpError::bad_gateway().wrap(cause);
        assert_eq!(err.message(), "Bad Gateway");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn io_errors_become_internal() {
        let err: Error = std::io::Error::other("disk on fire").into();
        assert!(matches!(err, Error::Internal(_)));
    }
}
