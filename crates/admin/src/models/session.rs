//! Session-related types for admin authentication.
//!
//! Types stored in the session for authentication state.

use rocha_brindes_backend::AuthSession;
use serde::{Deserialize, Serialize};

/// Session-stored admin identity.
///
/// Wraps the Firebase tokens from sign-in; the ID token authorizes every
/// write the admin makes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub auth: AuthSession,
}

impl CurrentAdmin {
    /// Firebase user id.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.auth.uid
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.auth.email
    }

    /// Bearer token for Firestore and Storage writes.
    #[must_use]
    pub fn id_token(&self) -> &str {
        &self.auth.id_token
    }
}

impl From<AuthSession> for CurrentAdmin {
    fn from(auth: AuthSession) -> Self {
        Self { auth }
    }
}

/// Session keys for admin data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for the pending flash message.
    pub const FLASH: &str = "flash";
}
