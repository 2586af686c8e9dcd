//! Fetch error taxonomy.

use std::fmt;

/// Failure of a single fetch attempt.
///
/// `Transport` and `Status` are transport-class failures, `Decode` means the
/// body arrived but was not JSON. All three are retried by
/// [`RetryingFetcher`](crate::retry::RetryingFetcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection refused, DNS failure, timeout, TLS failure, body read error.
    Transport(String),
    /// The server answered with a non-success HTTP status.
    Status { code: u16, body: String },
    /// The response body is not valid JSON.
    Decode(String),
}

impl FetchError {
    /// HTTP status code, when the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, FetchError::Decode(_))
    }

    pub(crate) fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => {
                let body = response.into_string().unwrap_or_default();
                FetchError::Status { code, body }
            }
            ureq::Error::Transport(transport) => {
                FetchError::Transport(format!("GET {} failed: {}", url, transport))
            }
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(message) => write!(f, "transport error: {}", message),
            FetchError::Status { code, .. } => write!(f, "HTTP Error {}", code),
            FetchError::Decode(message) => write!(f, "decode error: {}", message),
        }
    }
}

impl std::error::Error for FetchError {}
