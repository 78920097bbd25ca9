//! The request wrapper.
//!
//! Every call goes through the same pipeline: resolve the URL, assemble the
//! request, run request interceptors, send (racing the cancellation token if
//! one was given), decode the body, run response interceptors, then classify
//! the body against the success condition and settle per the outcome type.

use crate::condition;
use crate::config::{build_client, HttpConfig};
use crate::error::{HttpError, Rejection};
use crate::interceptor::Interceptor;
use crate::outcome::{decide, OutcomeType, Settle};
use crate::report::{BusinessFailure, ErrorReporter, LoggingReporter};
use crate::request::{resolve_url, RequestOptions, RequestParts};
use crate::response::{decode_body, unwrap_payload, RawResponse, ResponseKey};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Hook that rewrites a successful response body before classification.
pub type BodyReplacer = Arc<dyn Fn(Value) -> Value + Send + Sync>;

struct Inner {
    client: Client,
    config: HttpConfig,
    default_headers: HeaderMap,
    interceptors: Vec<Arc<dyn Interceptor>>,
    reporter: Arc<dyn ErrorReporter>,
    replace_body: Option<BodyReplacer>,
}

/// Configured HTTP wrapper. Cheap to clone; clones share configuration and
/// the connection pool.
#[derive(Clone)]
pub struct PureHttp {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PureHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PureHttp")
            .field("config", &self.inner.config)
            .field("interceptors", &self.inner.interceptors.len())
            .finish()
    }
}

impl PureHttp {
    /// Create a wrapper from config with the logging reporter and no
    /// interceptors.
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        Self::builder().config(config).build()
    }

    /// Start configuring a wrapper.
    pub fn builder() -> PureHttpBuilder {
        PureHttpBuilder::default()
    }

    /// The configuration this wrapper was built with.
    pub fn config(&self) -> &HttpConfig {
        &self.inner.config
    }

    /// Get the inner reqwest client.
    pub fn inner(&self) -> &Client {
        &self.inner.client
    }

    /// Make a GET, sending `params` as the query string.
    pub async fn get<P>(&self, url: &str, params: &P, options: RequestOptions) -> Result<Value, Rejection>
    where
        P: Serialize + ?Sized,
    {
        self.request(Method::GET, url, params, options).await
    }

    /// Make a POST, sending `params` as the body.
    pub async fn post<P>(&self, url: &str, params: &P, options: RequestOptions) -> Result<Value, Rejection>
    where
        P: Serialize + ?Sized,
    {
        self.request(Method::POST, url, params, options).await
    }

    /// Make a PUT, sending `params` as the body.
    pub async fn put<P>(&self, url: &str, params: &P, options: RequestOptions) -> Result<Value, Rejection>
    where
        P: Serialize + ?Sized,
    {
        self.request(Method::PUT, url, params, options).await
    }

    /// Make a DELETE, sending `params` as the body.
    pub async fn delete<P>(&self, url: &str, params: &P, options: RequestOptions) -> Result<Value, Rejection>
    where
        P: Serialize + ?Sized,
    {
        self.request(Method::DELETE, url, params, options).await
    }

    /// Make a PATCH, sending `params` as the body.
    pub async fn patch<P>(&self, url: &str, params: &P, options: RequestOptions) -> Result<Value, Rejection>
    where
        P: Serialize + ?Sized,
    {
        self.request(Method::PATCH, url, params, options).await
    }

    /// Perform one call.
    ///
    /// Resolves with the unwrapped payload when the success condition holds.
    /// Otherwise the outcome type decides between resolving with the full
    /// payload and the [`Rejection`] variants.
    pub async fn request<P>(
        &self,
        method: Method,
        url: &str,
        params: &P,
        options: RequestOptions,
    ) -> Result<Value, Rejection>
    where
        P: Serialize + ?Sized,
    {
        let url = resolve_url(&self.inner.config.base_url, url);
        let params = serde_json::to_value(params).map_err(HttpError::from);

        let span = tracing::debug_span!(target: "pure_http", "request", method = %method, url = %url);
        let result = match params {
            Ok(params) => {
                self.execute(&method, &url, &params, &options)
                    .instrument(span)
                    .await
            }
            Err(error) => Err(self.request_error(error)),
        };

        match result {
            Ok(response) => self.classify(&method, &url, response, &options),
            Err(error) => Err(self.settle_transport_error(&url, error, &options)),
        }
    }

    async fn execute(
        &self,
        method: &Method,
        url: &str,
        params: &Value,
        options: &RequestOptions,
    ) -> Result<RawResponse, HttpError> {
        let request = self.prepare(method, url, params, options).map_err(|e| self.request_error(e))?;
        let json_mode = options.json_mode.unwrap_or(self.inner.config.json_mode);

        let round_trip = async {
            let response = self.inner.client.execute(request).await?;
            let status = response.status();
            let headers = response.headers().clone();
            let final_url = response.url().clone();
            let text = response.text().await?;
            Ok::<_, HttpError>(RawResponse {
                status,
                headers,
                url: final_url,
                data: decode_body(&text, json_mode),
            })
        };

        let received = match &options.cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(HttpError::Cancelled),
                received = round_trip => received,
            },
            None => round_trip.await,
        };

        let mut response = received
            .and_then(|response| {
                if response.status.is_success() {
                    Ok(response)
                } else {
                    Err(HttpError::Status(Box::new(response)))
                }
            })
            .map_err(|e| self.response_error(e))?;

        for interceptor in &self.inner.interceptors {
            interceptor.on_response(&mut response)?;
        }
        Ok(response)
    }

    fn prepare(
        &self,
        method: &Method,
        url: &str,
        params: &Value,
        options: &RequestOptions,
    ) -> Result<reqwest::Request, HttpError> {
        let parts = RequestParts {
            method: method.clone(),
            url,
            params,
            default_headers: &self.inner.default_headers,
            default_timeout: self.inner.config.timeout(),
            options,
        };
        let mut request = parts.build(&self.inner.client)?;
        for interceptor in &self.inner.interceptors {
            interceptor.on_request(&mut request)?;
        }
        Ok(request)
    }

    fn request_error(&self, error: HttpError) -> HttpError {
        self.inner
            .interceptors
            .iter()
            .fold(error, |error, interceptor| interceptor.on_request_error(error))
    }

    fn response_error(&self, error: HttpError) -> HttpError {
        self.inner
            .interceptors
            .iter()
            .fold(error, |error, interceptor| interceptor.on_response_error(error))
    }

    fn classify(
        &self,
        method: &Method,
        url: &str,
        mut response: RawResponse,
        options: &RequestOptions,
    ) -> Result<Value, Rejection> {
        let config = &self.inner.config;

        if let Some(replace) = &self.inner.replace_body {
            response.data = replace(std::mem::take(&mut response.data));
        }

        let key = options.response_key.as_ref().unwrap_or(&config.response_key);
        let unwrapped = unwrap_payload(&response, key, options.with_headers);

        let success_condition = options.condition.as_ref().or(config.condition.as_ref());
        if condition::check(success_condition, &response.data) {
            return Ok(unwrapped.resolve);
        }

        let decision = decide(options.outcome);
        tracing::debug!(
            target: "pure_http",
            url = %url,
            outcome = ?options.outcome.map(OutcomeType::code),
            settle = ?decision.settle,
            "success condition not met"
        );

        let fields = options.error_fields.as_ref().unwrap_or(&config.error_fields);
        let failure = BusinessFailure::new(method, url, &response, fields);
        if let Some(hook) = &options.on_business_failure {
            hook(&failure);
        }
        if decision.report {
            self.inner.reporter.business_error(&failure);
        }

        match decision.settle {
            Settle::ResolvePayload => Ok(unwrapped.payload),
            Settle::RejectPayload => Err(Rejection::Payload(unwrapped.payload)),
            Settle::RejectResponse => Err(Rejection::Response(Box::new(response))),
            Settle::Unsettled => Err(Rejection::Unsettled { cause: None }),
        }
    }

    fn settle_transport_error(&self, url: &str, error: HttpError, options: &RequestOptions) -> Rejection {
        if error.is_cancelled() {
            tracing::debug!(target: "pure_http", url = %url, "request cancelled");
        } else {
            let status = error.response().map(|response| response.status.as_u16());
            tracing::error!(target: "pure_http", url = %url, status = ?status, "request error: {}", error);
            if !self.inner.config.is_whitelisted(url) {
                self.inner.reporter.transport_error(url, &error);
            }
        }

        if OutcomeType::rejects_transport_errors(options.outcome) {
            Rejection::Transport(error)
        } else {
            Rejection::Unsettled { cause: Some(error) }
        }
    }
}

/// Builder for [`PureHttp`].
#[derive(Default)]
pub struct PureHttpBuilder {
    config: HttpConfig,
    extra_headers: HeaderMap,
    interceptors: Vec<Arc<dyn Interceptor>>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    replace_body: Option<BodyReplacer>,
}

impl PureHttpBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: HttpConfig) -> Self {
        self.config = config;
        self
    }

    /// Prefix for relative request URLs.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Default body key unwrapped on success.
    pub fn response_key(mut self, key: impl Into<ResponseKey>) -> Self {
        self.config.response_key = key.into();
        self
    }

    /// Default business success condition.
    pub fn condition(mut self, condition: condition::SuccessCondition) -> Self {
        self.config.condition = Some(condition);
        self
    }

    /// Add a default header. Invalid names or values are ignored.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.extra_headers.insert(name, value);
        }
        self
    }

    /// Append an interceptor. Interceptors run in the order added.
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Replace the default [`LoggingReporter`].
    pub fn reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Rewrite every successful body before it is classified.
    pub fn replace_body<F>(mut self, replace: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.replace_body = Some(Arc::new(replace));
        self
    }

    /// Build the wrapper and its connection pool.
    pub fn build(self) -> Result<PureHttp, HttpError> {
        let client = build_client(&self.config)?;
        let mut default_headers = self.config.header_map()?;
        for (name, value) in &self.extra_headers {
            default_headers.insert(name.clone(), value.clone());
        }

        Ok(PureHttp {
            inner: Arc::new(Inner {
                client,
                config: self.config,
                default_headers,
                interceptors: self.interceptors,
                reporter: self.reporter.unwrap_or_else(|| Arc::new(LoggingReporter)),
                replace_body: self.replace_body,
            }),
        })
    }
}
