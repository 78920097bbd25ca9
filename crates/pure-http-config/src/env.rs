//! Environment variable handling.

use std::env;
use std::path::Path;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("required environment variable not set: {var}")]
    NotSet { var: String },

    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Environment variable names.
pub mod vars {
    pub const PURE_HTTP_CONFIG_PATH: &str = "PURE_HTTP_CONFIG_PATH";
    pub const PURE_HTTP_BASE_URL: &str = "PURE_HTTP_BASE_URL";
    pub const PURE_HTTP_TIMEOUT_MS: &str = "PURE_HTTP_TIMEOUT_MS";
    pub const APP_ENV: &str = "APP_ENV";
}

/// Environment access.
pub struct Environment {
    _guard: (),
}

impl Environment {
    /// Load `.env`, `.env.local` and `.env.<APP_ENV>` from the working
    /// directory. See [`Environment::init_in`].
    pub fn init() -> Result<Self, EnvError> {
        Self::init_in(Path::new("."))
    }

    /// Load `.env`, `.env.local` and `.env.<APP_ENV>` from `dir`. Missing
    /// files are skipped; later files do not override variables that are
    /// already set. Unreadable or malformed files are errors.
    pub fn init_in(dir: &Path) -> Result<Self, EnvError> {
        load_optional(&dir.join(".env"))?;
        load_optional(&dir.join(".env.local"))?;

        if let Ok(app_env) = env::var(vars::APP_ENV) {
            load_optional(&dir.join(format!(".env.{}", app_env)))?;
        }

        Ok(Self { _guard: () })
    }

    /// Get a required string variable.
    pub fn require(var: &str) -> Result<String, EnvError> {
        env::var(var).map_err(|_| EnvError::NotSet { var: var.to_string() })
    }

    /// Get an optional string variable.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok()
    }

    /// Get a variable with a default value.
    pub fn get_or(var: &str, default: &str) -> String {
        env::var(var).unwrap_or_else(|_| default.to_string())
    }

    /// Get a boolean variable.
    pub fn get_bool(var: &str) -> Option<bool> {
        env::var(var)
            .ok()
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
    }

    /// Get an integer variable.
    pub fn get_int<T: std::str::FromStr>(var: &str) -> Result<Option<T>, EnvError> {
        parse_int(var, env::var(var).ok())
    }
}

fn load_optional(path: &Path) -> Result<(), EnvError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn parse_int<T: std::str::FromStr>(var: &str, raw: Option<String>) -> Result<Option<T>, EnvError> {
    match raw {
        Some(v) => v.trim().parse().map(Some).map_err(|_| EnvError::InvalidValue {
            var: var.to_string(),
            message: format!("expected integer, got {v:?}"),
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_default() {
        let val = Environment::get_or("PURE_HTTP_NONEXISTENT_12345", "default");
        assert_eq!(val, "default");
    }

    #[test]
    fn test_require_missing() {
        match Environment::require("PURE_HTTP_NONEXISTENT_67890") {
            Err(EnvError::NotSet { var }) => assert_eq!(var, "PURE_HTTP_NONEXISTENT_67890"),
            other => panic!("expected NotSet, got {other:?}"),
        }
    }

    #[test]
    fn test_bool_parsing() {
        env::set_var("PURE_HTTP_TEST_BOOL", "yes");
        assert_eq!(Environment::get_bool("PURE_HTTP_TEST_BOOL"), Some(true));
        env::set_var("PURE_HTTP_TEST_BOOL", "off");
        assert_eq!(Environment::get_bool("PURE_HTTP_TEST_BOOL"), Some(false));
        env::remove_var("PURE_HTTP_TEST_BOOL");
        assert_eq!(Environment::get_bool("PURE_HTTP_TEST_BOOL"), None);
    }

    #[test]
    fn test_integer_parsing() {
        assert_eq!(parse_int::<u64>("X", Some("1500".into())).unwrap(), Some(1500));
        assert_eq!(parse_int::<u64>("X", None).unwrap(), None);
        match parse_int::<u64>("X", Some("soon".into())) {
            Err(EnvError::InvalidValue { var, message }) => {
                assert_eq!(var, "X");
                assert!(message.contains("soon"));
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_environment_init_without_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Environment::init_in(dir.path()).is_ok());
    }

    #[test]
    fn test_environment_init_loads_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "PURE_HTTP_TEST_DOTENV_VALUE=loaded\n").unwrap();

        Environment::init_in(dir.path()).unwrap();
        assert_eq!(Environment::get("PURE_HTTP_TEST_DOTENV_VALUE").as_deref(), Some("loaded"));
        env::remove_var("PURE_HTTP_TEST_DOTENV_VALUE");
    }

    #[test]
    fn test_environment_init_rejects_malformed_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env.local"), "PURE_HTTP_TEST_BROKEN LINE\n").unwrap();

        match Environment::init_in(dir.path()) {
            Err(EnvError::DotenvError(_)) => {}
            other => panic!("expected DotenvError, got {:?}", other.map(|_| ())),
        }
    }
}
