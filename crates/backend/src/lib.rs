//! Rocha Brindes Backend - Firebase REST clients.
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against the Firebase REST APIs, no SDK
//! - Firebase is the source of truth - NO local database, direct API calls
//! - In-memory caching via `moka` with per-resource freshness windows
//!
//! # APIs
//!
//! ## Firestore (v1)
//! - `produtos` and `categorias` collections, `config/layout` singleton
//! - Public reads with the web API key, writes with an ID token
//!
//! ## Cloud Storage (v0)
//! - Image uploads under `produtos/` and `assets/layout/`
//! - Prefix listings for the admin image picker
//!
//! ## Identity Toolkit
//! - Email/password sign-in and token refresh for the admin
//!
//! # Example
//!
//! ```rust,ignore
//! use rocha_brindes_backend::{FirebaseConfig, FirestoreClient};
//!
//! let firestore = FirestoreClient::new(&config);
//! let (products, categories) =
//!     tokio::try_join!(firestore.products(Some(50)), firestore.categories())?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod config;
pub mod firestore;
mod http;
pub mod storage;

pub use auth::{AuthClient, AuthSession};
pub use config::FirebaseConfig;
pub use firestore::{FirestoreClient, ProductCursor, ProductPage};
pub use storage::{StorageClient, StorageFile, StorageListing};

use thiserror::Error;

/// Errors that can occur when talking to Firebase.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Firebase answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A document did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing, expired or rejected credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited by Firebase.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}
