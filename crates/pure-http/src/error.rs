//! Error types for the request wrapper.

use crate::response::RawResponse;
use serde_json::Value;

/// Failures raised while building, sending, or receiving a request.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to serialize request parameters: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("unexpected status {}: {}", .0.status.as_u16(), .0.url)]
    Status(Box<RawResponse>),

    #[error("interceptor rejected: {0}")]
    Interceptor(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_builder() {
            HttpError::InvalidRequest(e.to_string())
        } else {
            HttpError::Request(e)
        }
    }
}

impl HttpError {
    /// Whether the caller aborted the request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HttpError::Cancelled)
    }

    /// The response carried by a non-2xx failure, if any.
    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            HttpError::Status(response) => Some(response),
            _ => None,
        }
    }
}

/// How a call settles when it does not resolve.
///
/// `Payload` and `Response` come from a failed business check, `Transport`
/// from the network or request assembly. `Unsettled` marks calls whose
/// outcome type asks for no rejection: the caller should treat it as "no
/// result" rather than as a failure to surface.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error("business check failed")]
    Payload(Value),

    #[error("business check failed with status {}", .0.status.as_u16())]
    Response(Box<RawResponse>),

    #[error(transparent)]
    Transport(#[from] HttpError),

    #[error("request left unsettled")]
    Unsettled { cause: Option<HttpError> },
}

impl Rejection {
    /// The rejected payload, for business failures that carry one.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Rejection::Payload(payload) => Some(payload),
            Rejection::Response(response) => Some(&response.data),
            _ => None,
        }
    }

    /// Whether the call was left without a result.
    pub fn is_unsettled(&self) -> bool {
        matches!(self, Rejection::Unsettled { .. })
    }
}
