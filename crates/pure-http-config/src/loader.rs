//! Configuration file loading and parsing.

use crate::env::{parse_int, vars, EnvError};
use pure_http::{HttpConfig, ResponseKey};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// File name looked up in the project directory.
pub const CONFIG_FILE: &str = "pure-http.yaml";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },

    #[error(transparent)]
    Env(#[from] EnvError),
}

/// Configuration loader.
pub struct ConfigLoader {
    base_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the given project directory.
    pub fn new(project_dir: impl AsRef<Path>) -> Self {
        Self {
            base_path: project_dir.as_ref().to_path_buf(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.base_path.join(CONFIG_FILE)
    }

    /// Load `pure-http.yaml` from the project directory, falling back to
    /// defaults when the file does not exist. Environment overrides apply
    /// either way.
    pub fn load(&self) -> Result<HttpConfig, ConfigError> {
        let config_path = self.config_path();
        if !config_path.exists() {
            let mut config = HttpConfig::default();
            apply_overrides(&mut config, |var| std::env::var(var).ok())?;
            validate(&config)?;
            return Ok(config);
        }
        Self::load_from(config_path)
    }

    /// Load from `PURE_HTTP_CONFIG_PATH` when set, otherwise from the
    /// working directory.
    pub fn load_default() -> Result<HttpConfig, ConfigError> {
        match std::env::var(vars::PURE_HTTP_CONFIG_PATH) {
            Ok(path) if !path.is_empty() => Self::load_from(path),
            _ => Self::default().load(),
        }
    }

    /// Load an explicit config file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<HttpConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound { path: path.to_path_buf() });
        }

        let contents = std::fs::read_to_string(path)?;
        let mut config = parse(&contents)?;
        apply_overrides(&mut config, |var| std::env::var(var).ok())?;
        validate(&config)?;
        Ok(config)
    }

    /// Save configuration to `pure-http.yaml`.
    pub fn save(&self, config: &HttpConfig) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.base_path)?;
        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;
        std::fs::write(self.config_path(), yaml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

/// Parse YAML config text after expanding environment references.
pub fn parse(contents: &str) -> Result<HttpConfig, ConfigError> {
    let expanded = expand_env_vars(contents)?;
    serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
        line: e.location().map(|l| l.line()),
        message: e.to_string(),
    })
}

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").expect("env var pattern is valid")
    })
}

/// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
pub fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut result = content.to_string();

    for cap in env_pattern().captures_iter(content) {
        let full_match = &cap[0];
        let var_name = &cap[1];
        let default = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) => v,
            Err(_) => match default {
                Some(d) => d.to_string(),
                None => {
                    return Err(ConfigError::EnvVarNotFound {
                        var: var_name.to_string(),
                    })
                }
            },
        };

        result = result.replace(full_match, &value);
    }

    Ok(result)
}

/// Apply `PURE_HTTP_BASE_URL` and `PURE_HTTP_TIMEOUT_MS` through `lookup`.
pub fn apply_overrides<F>(config: &mut HttpConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base_url) = lookup(vars::PURE_HTTP_BASE_URL) {
        config.base_url = base_url;
    }
    if let Some(timeout_ms) = parse_int::<u64>(vars::PURE_HTTP_TIMEOUT_MS, lookup(vars::PURE_HTTP_TIMEOUT_MS))? {
        config.timeout_ms = Some(timeout_ms);
    }
    Ok(())
}

/// Validate configuration values.
pub fn validate(config: &HttpConfig) -> Result<(), ConfigError> {
    if !config.base_url.is_empty() {
        let parsed = url::Url::parse(&config.base_url).map_err(|e| ConfigError::ValidationError {
            message: format!("base_url {:?} is not a valid URL: {e}", config.base_url),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError {
                message: format!("base_url must use http or https, got {}", parsed.scheme()),
            });
        }
    }

    if config.timeout_ms == Some(0) {
        return Err(ConfigError::ValidationError {
            message: "timeout_ms must be greater than 0".to_string(),
        });
    }

    if matches!(&config.response_key, ResponseKey::Key(key) if key.is_empty()) {
        return Err(ConfigError::ValidationError {
            message: "response_key must not be empty; use false to disable unwrapping".to_string(),
        });
    }

    if config.error_fields.code.is_empty() || config.error_fields.msg.is_empty() {
        return Err(ConfigError::ValidationError {
            message: "error_fields.code and error_fields.msg need at least one field".to_string(),
        });
    }

    Ok(())
}
