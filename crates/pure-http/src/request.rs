//! Per-call options and request assembly.

use crate::condition::SuccessCondition;
use crate::error::HttpError;
use crate::outcome::OutcomeType;
use crate::report::{BusinessFailure, ErrorFields};
use crate::response::{JsonMode, ResponseKey};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Client, Method};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Common content types.
pub mod content_types {
    pub const JSON: &str = "application/json";
    pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
    pub const MULTIPART: &str = "multipart/form-data";
}

/// Callback run whenever a call's success condition fails, whatever its
/// outcome type.
pub type BusinessFailureHook = Arc<dyn Fn(&BusinessFailure<'_>) + Send + Sync>;

/// Per-call overrides of the client defaults.
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    /// Query string for body-carrying methods. `GET` takes its query from
    /// the call's params instead.
    pub query: Option<Value>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
    pub response_key: Option<ResponseKey>,
    pub condition: Option<SuccessCondition>,
    pub outcome: Option<OutcomeType>,
    /// Settle with `{data, headers}` instead of the unwrapped body.
    pub with_headers: bool,
    pub json_mode: Option<JsonMode>,
    pub error_fields: Option<ErrorFields>,
    pub on_business_failure: Option<BusinessFailureHook>,
}

impl RequestOptions {
    /// Options that defer to the client defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `Content-Type`, which also selects the body encoding.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Query string sent alongside a body.
    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    /// Override the client timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Abort the call when `token` is cancelled.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Unwrap this body key instead of the client default.
    pub fn response_key(mut self, key: impl Into<ResponseKey>) -> Self {
        self.response_key = Some(key.into());
        self
    }

    /// Resolve with the whole body instead of unwrapping a key.
    pub fn raw_body(mut self) -> Self {
        self.response_key = Some(ResponseKey::Raw);
        self
    }

    /// Check this condition instead of the client default.
    pub fn condition(mut self, condition: SuccessCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// How a failed success condition settles.
    pub fn outcome(mut self, outcome: OutcomeType) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Settle with `{data, headers}`.
    pub fn with_headers(mut self) -> Self {
        self.with_headers = true;
        self
    }

    /// Decode the body with this mode instead of the client default.
    pub fn json_mode(mut self, mode: JsonMode) -> Self {
        self.json_mode = Some(mode);
        self
    }

    /// Read the business error code and message from these fields.
    pub fn error_fields(mut self, fields: ErrorFields) -> Self {
        self.error_fields = Some(fields);
        self
    }

    /// Run `hook` whenever the success condition fails.
    pub fn on_business_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&BusinessFailure<'_>) + Send + Sync + 'static,
    {
        self.on_business_failure = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("content_type", &self.content_type)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("timeout", &self.timeout)
            .field("cancel", &self.cancel.is_some())
            .field("response_key", &self.response_key)
            .field("condition", &self.condition)
            .field("outcome", &self.outcome)
            .field("with_headers", &self.with_headers)
            .field("json_mode", &self.json_mode)
            .field("error_fields", &self.error_fields)
            .field("on_business_failure", &self.on_business_failure.is_some())
            .finish()
    }
}

/// Where a method sends the call's params.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamsPlacement {
    Query,
    Body,
    Dropped,
}

/// Route a method's params to the query string or the body.
pub fn params_placement(method: &Method) -> ParamsPlacement {
    if *method == Method::GET {
        ParamsPlacement::Query
    } else if *method == Method::POST
        || *method == Method::PUT
        || *method == Method::DELETE
        || *method == Method::PATCH
    {
        ParamsPlacement::Body
    } else {
        ParamsPlacement::Dropped
    }
}

/// Join `url` onto `base_url`. Absolute URLs and an empty base leave `url`
/// unchanged.
pub fn resolve_url(base_url: &str, url: &str) -> String {
    if base_url.is_empty() || is_absolute(url) {
        return url.to_string();
    }
    if url.is_empty() {
        return base_url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

fn is_absolute(url: &str) -> bool {
    match url.find("://") {
        Some(idx) => {
            let scheme = &url[..idx];
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => url.starts_with("//"),
    }
}

/// Everything needed to assemble one request.
#[derive(Debug)]
pub struct RequestParts<'a> {
    pub method: Method,
    pub url: &'a str,
    pub params: &'a Value,
    pub default_headers: &'a HeaderMap,
    pub default_timeout: Option<Duration>,
    pub options: &'a RequestOptions,
}

impl RequestParts<'_> {
    /// Merged headers: defaults, then `content_type`, then per-call headers.
    pub fn headers(&self) -> Result<HeaderMap, HttpError> {
        let mut headers = self.default_headers.clone();
        if let Some(content_type) = &self.options.content_type {
            let value = HeaderValue::try_from(content_type.as_str())
                .map_err(|e| HttpError::InvalidRequest(format!("content type: {e}")))?;
            headers.insert(CONTENT_TYPE, value);
        }
        for (name, value) in &self.options.headers {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }

    /// Assemble the request on `client`.
    pub fn build(&self, client: &Client) -> Result<reqwest::Request, HttpError> {
        let mut headers = self.headers()?;
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let is_multipart = content_type.contains(content_types::MULTIPART);
        if is_multipart {
            // reqwest sets the boundary-carrying content type itself.
            headers.remove(CONTENT_TYPE);
        }

        let mut builder = client.request(self.method.clone(), self.url).headers(headers);

        if let Some(timeout) = self.options.timeout.or(self.default_timeout) {
            builder = builder.timeout(timeout);
        }

        let has_params = !self.params.is_null();
        match params_placement(&self.method) {
            ParamsPlacement::Query => {
                if has_params {
                    builder = builder.query(&encode_pairs(self.params)?);
                }
            }
            ParamsPlacement::Body => {
                if let Some(query) = self.options.query.as_ref().filter(|q| !q.is_null()) {
                    builder = builder.query(&encode_pairs(query)?);
                }
                if has_params {
                    builder = if is_multipart {
                        builder.multipart(multipart_form(self.params)?)
                    } else if content_type.contains(content_types::FORM_URLENCODED) {
                        builder.form(&encode_pairs(self.params)?)
                    } else {
                        builder.json(self.params)
                    };
                }
            }
            ParamsPlacement::Dropped => {}
        }

        Ok(builder.build()?)
    }
}

/// Flatten a params object into `key=value` pairs for query strings and
/// urlencoded bodies. `null` entries are skipped, arrays repeat as `key[]`,
/// strings go verbatim and other values are JSON-encoded.
pub fn encode_pairs(params: &Value) -> Result<Vec<(String, String)>, HttpError> {
    let object = match params {
        Value::Null => return Ok(Vec::new()),
        Value::Object(object) => object,
        _ => {
            return Err(HttpError::InvalidRequest(
                "query and form params must be a JSON object".to_string(),
            ))
        }
    };

    let mut pairs = Vec::with_capacity(object.len());
    for (key, value) in object {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                let key = format!("{key}[]");
                pairs.extend(
                    items
                        .iter()
                        .filter(|item| !item.is_null())
                        .map(|item| (key.clone(), scalar_text(item))),
                );
            }
            other => pairs.push((key.clone(), scalar_text(other))),
        }
    }
    Ok(pairs)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Turn a params object into text form fields. Strings are sent verbatim,
/// other values JSON-encoded.
pub fn multipart_form(params: &Value) -> Result<Form, HttpError> {
    let object = params.as_object().ok_or_else(|| {
        HttpError::InvalidRequest("multipart params must be a JSON object".to_string())
    })?;

    let form = object
        .iter()
        .fold(Form::new(), |form, (key, value)| form.text(key.clone(), scalar_text(value)));
    Ok(form)
}
