//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for the session store
//!   (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `COMMERCE_CONSUMER_KEY` - Commerce REST API consumer key
//! - `COMMERCE_CONSUMER_SECRET` - Commerce REST API consumer secret (high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `COMMERCE_API_URL` - Commerce REST API base (default: `https://renault-store.ir/wp-json/wc/v3`)
//! - `BLOG_API_URL` - Content API base (default: `https://renault-store.ir/wp-json/wp/v2`)
//! - `AUTH_API_URL` - JWT auth API base (default: `https://renault-store.ir/wp-json/jwt-auth/v1`)
//! - `PAYMENT_GATEWAY_URL` - Payment gateway base; payments are simulated when unset
//! - `PAYMENT_API_KEY` - Bearer token for the payment gateway
//! - `STORE_CURRENCY` - Display currency (default: IRR)
//! - `HTTP_TIMEOUT_SECS` - Timeout for every remote call (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)
//! - `LOG_FORMAT` - `json` for JSON log lines (default: human-readable)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use autoparts_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_COMMERCE_API_URL: &str = "https://renault-store.ir/wp-json/wc/v3";
const DEFAULT_BLOG_API_URL: &str = "https://renault-store.ir/wp-json/wp/v2";
const DEFAULT_AUTH_API_URL: &str = "https://renault-store.ir/wp-json/jwt-auth/v1";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Currency prices are displayed in
    pub currency: CurrencyCode,
    /// Timeout applied to every outbound request
    pub http_timeout: Duration,
    /// Commerce REST API configuration
    pub commerce: CommerceConfig,
    /// Content API base URL
    pub blog_api_url: Url,
    /// JWT auth API base URL
    pub auth_api_url: Url,
    /// Payment gateway configuration
    pub payment: PaymentConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 - 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 - 1.0)
    pub sentry_traces_sample_rate: f32,
    /// Write logs as JSON lines
    pub log_json: bool,
}

/// Commerce REST API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct CommerceConfig {
    /// API base, e.g. `https://shop.example/wp-json/wc/v3`
    pub api_url: Url,
    /// Consumer key (sent as a query parameter)
    pub consumer_key: SecretString,
    /// Consumer secret (sent as a query parameter)
    pub consumer_secret: SecretString,
}

impl std::fmt::Debug for CommerceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceConfig")
            .field("api_url", &self.api_url.as_str())
            .field("consumer_key", &"[REDACTED]")
            .field("consumer_secret", &"[REDACTED]")
            .finish()
    }
}

/// Payment gateway configuration.
///
/// With no gateway URL the storefront uses the simulated gateway.
#[derive(Clone, Default)]
pub struct PaymentConfig {
    pub gateway_url: Option<Url>,
    pub api_key: Option<SecretString>,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("gateway_url", &self.gateway_url.as_ref().map(Url::as_str))
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let currency = get_env_or_default("STORE_CURRENCY", "IRR")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("STORE_CURRENCY".to_string(), e))?;
        let http_timeout = get_env_or_default("HTTP_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "HTTP_TIMEOUT_SECS".to_string(),
                    "must be a positive number of seconds".to_string(),
                )
            })?;

        let commerce = CommerceConfig::from_env()?;
        let blog_api_url = get_url("BLOG_API_URL", DEFAULT_BLOG_API_URL)?;
        let auth_api_url = get_url("AUTH_API_URL", DEFAULT_AUTH_API_URL)?;
        let payment = PaymentConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_rate("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate = get_rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?;
        let log_json = get_env_or_default("LOG_FORMAT", "text").eq_ignore_ascii_case("json");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            currency,
            http_timeout,
            commerce,
            blog_api_url,
            auth_api_url,
            payment,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            log_json,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CommerceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_url("COMMERCE_API_URL", DEFAULT_COMMERCE_API_URL)?,
            consumer_key: get_required_secret("COMMERCE_CONSUMER_KEY")?,
            consumer_secret: get_validated_secret("COMMERCE_CONSUMER_SECRET")?,
        })
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let gateway_url = get_optional_env("PAYMENT_GATEWAY_URL")
            .map(|raw| parse_url("PAYMENT_GATEWAY_URL", &raw))
            .transpose()?;
        let api_key = get_optional_env("PAYMENT_API_KEY").map(SecretString::from);
        Ok(Self {
            gateway_url,
            api_key,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a sample rate in `0.0..=1.0`.
fn get_rate(key: &str, default: &str) -> Result<f32, ConfigError> {
    get_env_or_default(key, default)
        .parse::<f32>()
        .ok()
        .filter(|rate| (0.0..=1.0).contains(rate))
        .ok_or_else(|| {
            ConfigError::InvalidEnvVar(key.to_string(), "must be between 0.0 and 1.0".to_string())
        })
}

/// Get a URL-valued environment variable with a default.
fn get_url(key: &str, default: &str) -> Result<Url, ConfigError> {
    parse_url(key, &get_env_or_default(key, default))
}

/// Parse an API base URL. A trailing slash is added so relative paths join
/// under the base instead of replacing its last segment.
fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real API secrets are random; anything below this is typed by hand
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the secret generated by the commerce backend."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn commerce() -> CommerceConfig {
        CommerceConfig {
            api_url: Url::parse("https://shop.test/wp-json/wc/v3/").unwrap(),
            consumer_key: SecretString::from("ck_visible_in_logs_if_leaked"),
            consumer_secret: SecretString::from("cs_super_private_value"),
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-consumer-secret", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("cs_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_commerce_style_secret() {
        let result =
            validate_secret_strength("cs_9f8e7d6c5b4a39281706f5e4d3c2b1a0a1b2c3d4", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_url_adds_trailing_slash() {
        let url = parse_url("X", "https://shop.test/wp-json/wc/v3").unwrap();
        assert_eq!(url.as_str(), "https://shop.test/wp-json/wc/v3/");
        assert_eq!(
            url.join("products").unwrap().as_str(),
            "https://shop.test/wp-json/wc/v3/products"
        );
    }

    #[test]
    fn test_parse_url_rejects_garbage() {
        assert!(matches!(
            parse_url("COMMERCE_API_URL", "not a url"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            currency: CurrencyCode::IRR,
            http_timeout: Duration::from_secs(10),
            commerce: commerce(),
            blog_api_url: Url::parse(DEFAULT_BLOG_API_URL).unwrap(),
            auth_api_url: Url::parse(DEFAULT_AUTH_API_URL).unwrap(),
            payment: PaymentConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
            log_json: false,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_commerce_config_debug_redacts_secrets() {
        let debug_output = format!("{:?}", commerce());
        assert!(debug_output.contains("shop.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("ck_visible_in_logs_if_leaked"));
        assert!(!debug_output.contains("cs_super_private_value"));
    }

    #[test]
    fn test_payment_config_debug_redacts_key() {
        let config = PaymentConfig {
            gateway_url: Some(Url::parse("https://pay.test/").unwrap()),
            api_key: Some(SecretString::from("pk_live_abcdef")),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("pay.test"));
        assert!(!debug_output.contains("pk_live_abcdef"));
    }
}
