//! Application state shared across handlers.

use std::sync::Arc;

use rocha_brindes_backend::FirestoreClient;
use rocha_brindes_core::ImageCdn;

use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the Firestore client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    firestore: FirestoreClient,
    cdn: ImageCdn,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured image CDN URL is invalid.
    pub fn new(config: StorefrontConfig) -> Result<Self, url::ParseError> {
        let firestore = FirestoreClient::new(&config.firebase);
        let cdn = ImageCdn::new(&config.image_cdn_url)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                firestore,
                cdn,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the Firestore client.
    #[must_use]
    pub fn firestore(&self) -> &FirestoreClient {
        &self.inner.firestore
    }

    /// Get a reference to the image CDN URL builder.
    #[must_use]
    pub fn cdn(&self) -> &ImageCdn {
        &self.inner.cdn
    }
}
