//! Errors returned by calls to the remote backend.

use serde::Deserialize;

/// What went wrong with a backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The request could not be sent or no response was received.
    Network,
    /// The backend answered with a non-success HTTP status.
    Status(u16),
    /// The response body did not have the expected shape.
    Decode,
    /// The call requires a signed-in user but there is no session.
    NotSignedIn,
}

/// A failed backend request.
///
/// `message` is the human readable reason, taken from the backend's error body
/// when there is one, so that it can be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(error: impl std::fmt::Display) -> Self {
        Self::new(BackendErrorKind::Network, format!("network error: {error}"))
    }

    pub fn decode(error: impl std::fmt::Display) -> Self {
        Self::new(
            BackendErrorKind::Decode,
            format!("unexpected response from the backend: {error}"),
        )
    }

    pub fn not_signed_in() -> Self {
        Self::new(BackendErrorKind::NotSignedIn, "you are not signed in")
    }

    /// Build an error from a non-success response.
    ///
    /// The auth API and the data API use different field names for the error
    /// text, so the first one present wins, falling back to the raw body and
    /// then to the status code.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(ErrorBody::into_message)
            .or_else(|| {
                let body = body.trim();
                (!body.is_empty()).then(|| body.to_owned())
            })
            .unwrap_or_else(|| format!("request failed with status {status}"));

        Self::new(BackendErrorKind::Status(status), message)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.message)
            .or(self.msg)
            .or(self.error)
    }
}
