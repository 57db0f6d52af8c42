//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_BASE_URL` - Public URL for the admin panel
//! - `FIREBASE_API_KEY` - Firebase web API key
//! - `FIREBASE_PROJECT_ID` - Firebase project ID
//! - `FIREBASE_STORAGE_BUCKET` - Firebase Storage bucket
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_BASE_PATH` - Path prefix for every admin screen (default: /admin)
//! - `IMAGE_CDN_URL` - Resizing CDN for previews (default: <https://images.weserv.nl>)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};

use rocha_brindes_backend::FirebaseConfig;
use rocha_brindes_core::image::DEFAULT_CDN;
use secrecy::SecretString;
use thiserror::Error;

/// Default path prefix for the admin screens.
pub const DEFAULT_BASE_PATH: &str = "/admin";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin panel
    pub base_url: String,
    /// Path prefix of every admin screen, e.g. `/admin`
    pub base_path: String,
    /// Base URL of the image resizing CDN
    pub image_cdn_url: String,
    /// Firebase project settings
    pub firebase: FirebaseConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

impl AdminConfig {
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

        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("ADMIN_BASE_URL")?;
        let base_path = parse_base_path(&get_env_or_default("ADMIN_BASE_PATH", DEFAULT_BASE_PATH))?;

        let image_cdn_url = get_env_or_default("IMAGE_CDN_URL", DEFAULT_CDN);
        url::Url::parse(&image_cdn_url)
            .map_err(|e| ConfigError::InvalidEnvVar("IMAGE_CDN_URL".to_string(), e.to_string()))?;

        let firebase = FirebaseConfig {
            api_key: SecretString::from(get_required_env("FIREBASE_API_KEY")?),
            project_id: get_required_env("FIREBASE_PROJECT_ID")?,
            storage_bucket: get_required_env("FIREBASE_STORAGE_BUCKET")?,
        };

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
            base_path,
            image_cdn_url,
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

    /// Absolute path of an admin screen, e.g. `path("/produtos")`. The
    /// dashboard is the bare base path.
    #[must_use]
    pub fn path(&self, route: &str) -> String {
        match route {
            "" | "/" => self.base_path.clone(),
            _ => format!("{}{route}", self.base_path),
        }
    }
}

/// The base path must be absolute, without a trailing slash, and use only
/// characters that are safe in a URL path segment.
fn parse_base_path(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| {
        ConfigError::InvalidEnvVar("ADMIN_BASE_PATH".to_string(), reason.to_string())
    };

    let path = raw.trim();
    if !path.starts_with('/') || path.len() < 2 {
        return Err(invalid("must start with / and name a path"));
    }
    if path.ends_with('/') {
        return Err(invalid("must not end with /"));
    }
    if path
        .split('/')
        .skip(1)
        .any(|segment| segment.is_empty() || !segment.chars().all(is_path_char))
    {
        return Err(invalid("segments may only use letters, digits, - and _"));
    }
    Ok(path.to_string())
}

const fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
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
pub(crate) fn test_config() -> AdminConfig {
    AdminConfig {
        host: IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
        port: 3001,
        base_url: "http://localhost:3001".to_string(),
        base_path: DEFAULT_BASE_PATH.to_string(),
        image_cdn_url: DEFAULT_CDN.to_string(),
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_base_path_validation() {
        assert_eq!(parse_base_path("/admin").unwrap(), "/admin");
        assert_eq!(parse_base_path(" /painel-x7f2 ").unwrap(), "/painel-x7f2");
        assert_eq!(parse_base_path("/gestao/rb").unwrap(), "/gestao/rb");
        assert!(parse_base_path("admin").is_err());
        assert!(parse_base_path("/admin/").is_err());
        assert!(parse_base_path("/").is_err());
        assert!(parse_base_path("//admin").is_err());
        assert!(parse_base_path("/adm?x=1").is_err());
    }

    #[test]
    fn test_path_joins_base() {
        let config = test_config();
        assert_eq!(config.path("/"), "/admin");
        assert_eq!(config.path("/produtos"), "/admin/produtos");
    }

    #[test]
    fn test_debug_redacts_firebase_key() {
        let debug_output = format!("{:?}", test_config());
        assert!(!debug_output.contains("test-api-key"));
    }
}
