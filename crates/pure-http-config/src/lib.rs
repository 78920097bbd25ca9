//! Configuration loading for pure-http.
//!
//! Reads `pure-http.yaml` into a [`pure_http::HttpConfig`], expanding
//! `${VAR}` / `${VAR:-default}` references and applying `PURE_HTTP_*`
//! environment overrides before validation.

pub mod env;
pub mod loader;

pub use env::*;
pub use loader::*;
