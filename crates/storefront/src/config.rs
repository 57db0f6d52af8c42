//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `FIREBASE_API_KEY` - Firebase web API key
//! - `FIREBASE_PROJECT_ID` - Firebase project ID
//! - `FIREBASE_STORAGE_BUCKET` - Firebase Storage bucket
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `WHATSAPP_NUMBER` - Number receiving quote messages (default: 5589994333316)
//! - `IMAGE_CDN_URL` - Resizing CDN (default: <https://images.weserv.nl>)
//! - `CATALOG_PRODUCT_LIMIT` - Cap on products loaded on the home page, 0 for all (default: 0)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};

use rocha_brindes_backend::FirebaseConfig;
use rocha_brindes_core::image::DEFAULT_CDN;
use secrecy::SecretString;
use thiserror::Error;

/// Default WhatsApp number for quote requests.
pub const DEFAULT_WHATSAPP_NUMBER: &str = "5589994333316";

/// Default home page product cap: none, so filters see the whole catalog.
pub const DEFAULT_PRODUCT_LIMIT: &str = "0";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// WhatsApp number (digits, with country code) receiving quotes
    pub whatsapp_number: String,
    /// Base URL of the image resizing CDN
    pub image_cdn_url: String,
    /// Products loaded for the home page; `None` loads all
    pub catalog_product_limit: Option<u32>,
    /// Firebase project settings
    pub firebase: FirebaseConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
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

        let whatsapp_number =
            parse_whatsapp_number(&get_env_or_default("WHATSAPP_NUMBER", DEFAULT_WHATSAPP_NUMBER))?;
        let image_cdn_url = get_env_or_default("IMAGE_CDN_URL", DEFAULT_CDN);
        url::Url::parse(&image_cdn_url)
            .map_err(|e| ConfigError::InvalidEnvVar("IMAGE_CDN_URL".to_string(), e.to_string()))?;
        let catalog_product_limit =
            parse_product_limit(&get_env_or_default("CATALOG_PRODUCT_LIMIT", DEFAULT_PRODUCT_LIMIT))?;

        let firebase = firebase_from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            host,
            port,
            base_url,
            whatsapp_number,
            image_cdn_url,
            catalog_product_limit,
            firebase,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn firebase_from_env() -> Result<FirebaseConfig, ConfigError> {
    Ok(FirebaseConfig {
        api_key: SecretString::from(get_required_env("FIREBASE_API_KEY")?),
        project_id: get_required_env("FIREBASE_PROJECT_ID")?,
        storage_bucket: get_required_env("FIREBASE_STORAGE_BUCKET")?,
    })
}

/// Keep only digits; the number must still have some.
fn parse_whatsapp_number(raw: &str) -> Result<String, ConfigError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            "WHATSAPP_NUMBER".to_string(),
            "must contain digits".to_string(),
        ));
    }
    Ok(digits)
}

/// `0` means no limit.
fn parse_product_limit(raw: &str) -> Result<Option<u32>, ConfigError> {
    let limit = raw.trim().parse::<u32>().map_err(|e| {
        ConfigError::InvalidEnvVar("CATALOG_PRODUCT_LIMIT".to_string(), e.to_string())
    })?;
    Ok((limit > 0).then_some(limit))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Configuration for unit tests.
#[cfg(test)]
pub(crate) fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        whatsapp_number: DEFAULT_WHATSAPP_NUMBER.to_string(),
        image_cdn_url: DEFAULT_CDN.to_string(),
        catalog_product_limit: None,
        firebase: FirebaseConfig {
            api_key: SecretString::from("test-api-key"),
            project_id: "rocha-brindes".to_string(),
            storage_bucket: "rocha-brindes.firebasestorage.app".to_string(),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.1,
    }
}
