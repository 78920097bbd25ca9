//! Configurable HTTP request wrapper.
//!
//! Wraps a `reqwest` client with interceptor hooks, a declarative business
//! success condition checked against response bodies, payload unwrapping by
//! key, big-integer-safe JSON decoding, and an outcome-type table deciding how
//! failed business checks settle.

pub mod client;
pub mod condition;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod outcome;
pub mod report;
pub mod request;
pub mod response;

pub use client::{BodyReplacer, PureHttp, PureHttpBuilder};
pub use condition::{Expected, SuccessCondition};
pub use config::{build_client, HttpConfig};
pub use error::{HttpError, Rejection};
pub use interceptor::{Interceptor, LoggingInterceptor};
pub use outcome::{decide, Decision, OutcomeType, Settle};
pub use report::{status_message, BusinessFailure, ErrorFields, ErrorReporter, LoggingReporter};
pub use request::{content_types, RequestOptions};
pub use response::{decode_body, JsonMode, RawResponse, ResponseKey};

pub use reqwest::Method;
pub use tokio_util::sync::CancellationToken;
