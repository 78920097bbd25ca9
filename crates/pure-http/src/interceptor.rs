//! Request and response interceptors.
//!
//! Interceptors run in registration order around every call. Request hooks
//! see the fully assembled `reqwest::Request` and may edit it or refuse it.
//! Response hooks see the decoded [`RawResponse`] of a 2xx reply. The error
//! hooks map failures of their phase before they are settled.

use crate::error::HttpError;
use crate::response::RawResponse;

/// Hooks around a single call.
pub trait Interceptor: Send + Sync {
    /// Called before the request is sent. Returning an error aborts the call
    /// through [`Interceptor::on_request_error`].
    fn on_request(&self, _request: &mut reqwest::Request) -> Result<(), HttpError> {
        Ok(())
    }

    /// Maps a failure raised while assembling the request.
    fn on_request_error(&self, error: HttpError) -> HttpError {
        error
    }

    /// Called for 2xx responses. Returning an error sends the call down the
    /// transport-failure path without passing through
    /// [`Interceptor::on_response_error`].
    fn on_response(&self, _response: &mut RawResponse) -> Result<(), HttpError> {
        Ok(())
    }

    /// Maps a transport failure or non-2xx response.
    fn on_response_error(&self, error: HttpError) -> HttpError {
        error
    }
}

/// Logs each phase at debug level. Never logs bodies or header values.
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor;

impl Interceptor for LoggingInterceptor {
    fn on_request(&self, request: &mut reqwest::Request) -> Result<(), HttpError> {
        tracing::debug!(target: "pure_http", method = %request.method(), url = %request.url(), "sending request");
        Ok(())
    }

    fn on_request_error(&self, error: HttpError) -> HttpError {
        tracing::debug!(target: "pure_http", err = %error, "request rejected before send");
        error
    }

    fn on_response(&self, response: &mut RawResponse) -> Result<(), HttpError> {
        tracing::debug!(target: "pure_http", url = %response.url, status = response.status.as_u16(), "response received");
        Ok(())
    }

    fn on_response_error(&self, error: HttpError) -> HttpError {
        tracing::debug!(target: "pure_http", err = %error, "response error");
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use reqwest::{Method, StatusCode};
    use serde_json::json;

    struct Noop;
    impl Interceptor for Noop {}

    #[test]
    fn test_default_hooks_pass_through() {
        let mut request = reqwest::Request::new(Method::GET, "http://localhost/x".parse().unwrap());
        assert!(Noop.on_request(&mut request).is_ok());
        assert!(matches!(Noop.on_request_error(HttpError::Timeout), HttpError::Timeout));
        assert!(matches!(Noop.on_response_error(HttpError::Cancelled), HttpError::Cancelled));

        let mut response = RawResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            url: "http://localhost/x".parse().unwrap(),
            data: json!({ "ok": true }),
        };
        assert!(Noop.on_response(&mut response).is_ok());
        assert_eq!(response.data, json!({ "ok": true }));
    }

    #[test]
    fn test_logging_interceptor_is_transparent() {
        let mut request = reqwest::Request::new(Method::POST, "http://localhost/y".parse().unwrap());
        assert!(LoggingInterceptor.on_request(&mut request).is_ok());
        assert_eq!(request.method(), &Method::POST);
        let err = LoggingInterceptor.on_response_error(HttpError::Interceptor("nope".into()));
        assert_eq!(err.to_string(), "interceptor rejected: nope");
    }
}
