//! Error reporting hooks.
//!
//! The wrapper never renders anything itself; it hands business and
//! transport failures to an [`ErrorReporter`]. [`LoggingReporter`] is the
//! default and writes `tracing` events.

use crate::error::HttpError;
use crate::response::{is_truthy, RawResponse};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Candidate body fields holding the business error code and message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorFields {
    pub code: Vec<String>,
    pub msg: Vec<String>,
}

impl Default for ErrorFields {
    fn default() -> Self {
        Self {
            code: vec!["code".to_string()],
            msg: vec!["msg".to_string(), "message".to_string()],
        }
    }
}

impl ErrorFields {
    /// First code field present in `body` with a truthy value.
    pub fn pick_code<'a>(&self, body: &'a Value) -> Option<&'a Value> {
        pick(&self.code, body)
    }

    /// First message field present in `body` with a truthy value.
    pub fn pick_message<'a>(&self, body: &'a Value) -> Option<&'a Value> {
        pick(&self.msg, body)
    }
}

fn pick<'a>(candidates: &[String], body: &'a Value) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|field| body.get(field.as_str()))
        .find(|value| is_truthy(value))
}

/// A response that failed its success condition.
#[derive(Debug, Clone, Copy)]
pub struct BusinessFailure<'a> {
    pub method: &'a Method,
    pub url: &'a str,
    pub response: &'a RawResponse,
    pub code: Option<&'a Value>,
    pub message: Option<&'a Value>,
}

impl<'a> BusinessFailure<'a> {
    /// Pick the code and message out of the response body.
    pub fn new(
        method: &'a Method,
        url: &'a str,
        response: &'a RawResponse,
        fields: &ErrorFields,
    ) -> Self {
        Self {
            method,
            url,
            response,
            code: fields.pick_code(&response.data),
            message: fields.pick_message(&response.data),
        }
    }

    /// `"<code>: <message>"` using whatever the body provided.
    pub fn summary(&self) -> String {
        format!("{}: {}", display_or_dash(self.code), display_or_dash(self.message))
    }
}

fn display_or_dash(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "-".to_string(),
    }
}

/// Receives failures for user-facing reporting.
pub trait ErrorReporter: Send + Sync {
    /// A response failed its success condition and the outcome type asks
    /// for a report.
    fn business_error(&self, failure: &BusinessFailure<'_>);

    /// A request failed in transport or with a non-2xx status. Cancellations
    /// and whitelisted URLs never reach this hook.
    fn transport_error(&self, _url: &str, _error: &HttpError) {}
}

/// Reporter that writes `tracing` warnings.
#[derive(Debug, Clone, Default)]
pub struct LoggingReporter;

impl ErrorReporter for LoggingReporter {
    fn business_error(&self, failure: &BusinessFailure<'_>) {
        tracing::warn!(
            target: "pure_http",
            method = %failure.method,
            url = %failure.url,
            status = failure.response.status.as_u16(),
            "business error {}",
            failure.summary()
        );
    }

    fn transport_error(&self, url: &str, error: &HttpError) {
        tracing::warn!(target: "pure_http", url = %url, "request error: {}", describe_transport_error(error));
    }
}

/// Human-readable line for a transport failure: status plus its standard
/// description when the server answered, the error itself otherwise.
pub fn describe_transport_error(error: &HttpError) -> String {
    match error.response() {
        Some(response) => {
            let status = response.status.as_u16();
            match status_message(status) {
                Some(message) => format!("{status}: {message}"),
                None => format!("{status}: {error}"),
            }
        }
        None => format!("error: {error}"),
    }
}

/// Standard description of common HTTP statuses.
pub fn status_message(status: u16) -> Option<&'static str> {
    let message = match status {
        200 => "The server successfully returned the requested data.",
        201 => "Data was created or modified successfully.",
        202 => "The request has been queued for background processing.",
        204 => "Data was deleted successfully.",
        400 => "The request was malformed; the server did not create or modify any data.",
        401 => "The user is not authenticated (bad token, username or password).",
        403 => "The user is authenticated but access is forbidden.",
        404 => "The request targeted a record that does not exist.",
        406 => "The requested format is not available.",
        410 => "The requested resource was permanently deleted.",
        422 => "A validation error occurred while creating an object.",
        500 => "The server encountered an error.",
        502 => "Bad gateway.",
        503 => "Service unavailable; the server is overloaded or under maintenance.",
        504 => "Gateway timeout.",
        _ => return None,
    };
    Some(message)
}
