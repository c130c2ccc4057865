//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string
//! - `CATALOG_BASE_URL` - Base URL of the product catalog API
//! - `CATALOG_API_KEY` - Catalog API key
//! - `PAYMENT_BASE_URL` - Base URL of the payment processor API
//! - `PAYMENT_API_KEY` - Payment processor API key
//!
//! ## Optional
//! - `PIX_DISCOUNT_PERCENT` - Percentage discount applied to pix checkouts
//!   (e.g., `5` for 5%). Disabled when unset.

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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
    /// Product catalog API configuration
    pub catalog: CatalogConfig,
    /// Payment processor API configuration
    pub payment: PaymentConfig,
    /// Percentage discount for pix checkouts, if the rule is enabled
    pub pix_discount_percent: Option<Decimal>,
}

/// Product catalog API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Base URL of the catalog API
    pub base_url: String,
    /// API key sent on every request
    pub api_key: SecretString,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Payment processor API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct PaymentConfig {
    /// Base URL of the payment processor API
    pub base_url: String,
    /// API key sent on every request
    pub api_key: SecretString,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
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
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if an API key looks like an unreplaced placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(require("STOREFRONT_DATABASE_URL")?);

        let catalog = CatalogConfig {
            base_url: require_url("CATALOG_BASE_URL")?,
            api_key: require_api_key("CATALOG_API_KEY")?,
        };

        let payment = PaymentConfig {
            base_url: require_url("PAYMENT_BASE_URL")?,
            api_key: require_api_key("PAYMENT_API_KEY")?,
        };

        let pix_discount_percent = match std::env::var("PIX_DISCOUNT_PERCENT") {
            Ok(raw) => Some(parse_percent("PIX_DISCOUNT_PERCENT", &raw)?),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            catalog,
            payment,
            pix_discount_percent,
        })
    }
}

fn require(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn require_url(name: &str) -> Result<String, ConfigError> {
    let raw = require(name)?;
    Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), e.to_string()))?;
    Ok(raw.trim_end_matches('/').to_string())
}

fn require_api_key(name: &str) -> Result<SecretString, ConfigError> {
    let raw = require(name)?;
    validate_api_key(name, &raw)?;
    Ok(SecretString::from(raw))
}

/// Reject API keys that still look like template placeholders.
fn validate_api_key(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            name.to_string(),
            "must not be empty".to_string(),
        ));
    }

    let lowered = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lowered.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                name.to_string(),
                format!("looks like a placeholder (contains {pattern:?})"),
            ));
        }
    }

    Ok(())
}

fn parse_percent(name: &str, raw: &str) -> Result<Decimal, ConfigError> {
    let percent: Decimal = raw
        .parse()
        .map_err(|_| ConfigError::InvalidEnvVar(name.to_string(), format!("not a number: {raw}")))?;

    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(ConfigError::InvalidEnvVar(
            name.to_string(),
            format!("must be between 0 and 100, got {raw}"),
        ));
    }

    Ok(percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_api_keys_are_rejected() {
        assert!(validate_api_key("CATALOG_API_KEY", "your-api-key-here").is_err());
        assert!(validate_api_key("CATALOG_API_KEY", "CHANGEME").is_err());
        assert!(validate_api_key("CATALOG_API_KEY", "").is_err());
        assert!(validate_api_key("CATALOG_API_KEY", "sk_live_8f3a91c2d7").is_ok());
    }

    #[test]
    fn test_percent_bounds() {
        assert!(parse_percent("PIX_DISCOUNT_PERCENT", "5").is_ok());
        assert!(parse_percent("PIX_DISCOUNT_PERCENT", "0").is_ok());
        assert!(parse_percent("PIX_DISCOUNT_PERCENT", "100").is_ok());
        assert!(parse_percent("PIX_DISCOUNT_PERCENT", "-1").is_err());
        assert!(parse_percent("PIX_DISCOUNT_PERCENT", "101").is_err());
        assert!(parse_percent("PIX_DISCOUNT_PERCENT", "five").is_err());
    }
}
