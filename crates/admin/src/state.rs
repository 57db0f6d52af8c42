//! Application state shared across handlers.

use std::sync::Arc;

use rocha_brindes_backend::{AuthClient, FirestoreClient, StorageClient};
use rocha_brindes_core::ImageCdn;

use crate::config::AdminConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the Firebase clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    firestore: FirestoreClient,
    storage: StorageClient,
    auth: AuthClient,
    cdn: ImageCdn,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured image CDN URL is invalid.
    pub fn new(config: AdminConfig) -> Result<Self, url::ParseError> {
        let firestore = FirestoreClient::new(&config.firebase);
        let storage = StorageClient::new(&config.firebase);
        let auth = AuthClient::new(&config.firebase);
        let cdn = ImageCdn::new(&config.image_cdn_url)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                firestore,
                storage,
                auth,
                cdn,
            }),
        })
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the Firestore client.
    #[must_use]
    pub fn firestore(&self) -> &FirestoreClient {
        &self.inner.firestore
    }

    /// Get a reference to the Storage client.
    #[must_use]
    pub fn storage(&self) -> &StorageClient {
        &self.inner.storage
    }

    /// Get a reference to the sign-in client.
    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.inner.auth
    }

    /// Get a reference to the image CDN URL builder (list previews).
    #[must_use]
    pub fn cdn(&self) -> &ImageCdn {
        &self.inner.cdn
    }

    /// Drop every cached read after a write, so the next screen shows it.
    pub async fn invalidate_caches(&self) {
        tokio::join!(
            self.inner.firestore.invalidate_all(),
            self.inner.storage.invalidate_all()
        );
    }
}
