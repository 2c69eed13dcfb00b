//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPLINE_API_URL` - Base URL of the storefront backend (e.g., `https://shop.example.com`)
//!
//! ## Optional
//! - `SHOPLINE_TOKEN_PATH` - File holding the persisted access token
//!   (default: `<config dir>/shopline/access_token`)
//! - `SHOPLINE_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `SHOPLINE_CATEGORY_CACHE_TTL_SECS` - Category list cache lifetime (default: 300)
//! - `SHOPLINE_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_HTTP_TIMEOUT_SECS: &str = "15";
const DEFAULT_CATEGORY_CACHE_TTL_SECS: &str = "300";
const TOKEN_FILE_NAME: &str = "access_token";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `pretty` or `json`, got `{other}`")),
        }
    }
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend base URL, always ending in `/` so endpoint paths join under it
    pub api_url: Url,
    /// Where the access token is persisted between runs
    pub token_path: PathBuf,
    /// Per-request timeout
    pub http_timeout: Duration,
    /// Lifetime of the cached category list
    pub category_cache_ttl: Duration,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_required_env("SHOPLINE_API_URL")?)?;
        let token_path = get_optional_env("SHOPLINE_TOKEN_PATH")
            .map_or_else(default_token_path, PathBuf::from);
        let http_timeout = get_secs("SHOPLINE_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        let category_cache_ttl = get_secs(
            "SHOPLINE_CATEGORY_CACHE_TTL_SECS",
            DEFAULT_CATEGORY_CACHE_TTL_SECS,
        )?;
        let log_format = get_env_or_default("SHOPLINE_LOG_FORMAT", "pretty")
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHOPLINE_LOG_FORMAT".to_string(), e))?;

        Ok(Self {
            api_url,
            token_path,
            http_timeout,
            category_cache_ttl,
            log_format,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration pointing at `api_url` with defaults for everything else.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not an absolute
    /// http(s) URL.
    pub fn for_api_url(api_url: &str, token_path: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url(api_url)?,
            token_path,
            http_timeout: Duration::from_secs(15),
            category_cache_ttl: Duration::from_secs(300),
            log_format: LogFormat::Pretty,
            sentry_dsn: None,
            sentry_environment: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and normalize the backend base URL.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("SHOPLINE_API_URL".to_string(), msg);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    // Url::join drops the last segment unless the path ends in a slash
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Default token location under the platform config directory.
fn default_token_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shopline")
        .join(TOKEN_FILE_NAME)
}

/// Get a duration in whole seconds.
fn get_secs(key: &str, default: &str) -> Result<Duration, ConfigError> {
    get_env_or_default(key, default)
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_gets_trailing_slash() {
        let url = parse_api_url("https://shop.example.com/v1").unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/v1/");
        assert_eq!(
            url.join("api/products").unwrap().as_str(),
            "https://shop.example.com/v1/api/products"
        );
    }

    #[test]
    fn test_api_url_rejects_other_schemes() {
        let err = parse_api_url("ftp://shop.example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
        assert!(parse_api_url("not a url").is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_for_api_url_defaults() {
        let config =
            StorefrontConfig::for_api_url("http://127.0.0.1:5000", PathBuf::from("/tmp/t")).unwrap();
        assert_eq!(config.api_url.as_str(), "http://127.0.0.1:5000/");
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_default_token_path_file_name() {
        assert!(default_token_path().ends_with("shopline/access_token"));
    }
}
