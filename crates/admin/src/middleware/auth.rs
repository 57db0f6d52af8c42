//! Authentication middleware and extractors for admin.
//!
//! Provides the extractor that guards every admin screen. It also keeps the
//! Firebase ID token fresh, so handlers can hand it straight to a write.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use rocha_brindes_backend::BackendError;
use tower_sessions::Session;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{CurrentAdmin, session_keys};
use crate::state::AppState;

/// Extractor that requires admin authentication.
///
/// If the admin is not logged in, or their token can no longer be
/// refreshed, redirects to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Olá, {}!", admin.email())
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Error returned when admin authentication is required but the user is not logged in.
pub enum AdminAuthRejection {
    /// Redirect to the login page at this path.
    RedirectToLogin(String),
    /// No session layer on this route.
    Unauthorized,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(login) => Redirect::to(&login).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAdminAuth {
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AdminAuthRejection::Unauthorized)?;
        let login = || AdminAuthRejection::RedirectToLogin(state.config().path("/login"));

        let admin: CurrentAdmin = session
            .get(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
            .ok_or_else(login)?;

        if !admin.auth.needs_refresh(Utc::now()) {
            set_sentry_user(admin.uid(), Some(admin.email()));
            return Ok(Self(admin));
        }

        match state.auth().refresh(&admin.auth).await {
            Ok(auth) => {
                let admin = CurrentAdmin::from(auth);
                if let Err(e) = set_current_admin(session, &admin).await {
                    tracing::warn!(error = %e, "Failed to store refreshed admin token");
                }
                tracing::debug!(uid = %admin.uid(), "Refreshed admin ID token");
                set_sentry_user(admin.uid(), Some(admin.email()));
                Ok(Self(admin))
            }
            Err(e) => {
                match e {
                    BackendError::Unauthorized(_) => {
                        tracing::info!(uid = %admin.uid(), "Admin token revoked, signing out");
                    }
                    _ => tracing::warn!(error = %e, "Failed to refresh admin token"),
                }
                let _ = clear_current_admin(session).await;
                clear_sentry_user();
                Err(login())
            }
        }
    }
}

/// Helper to set the current admin in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Helper to clear the current admin from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::{Request, header}, routing::get};
    use tower::ServiceExt;

    use super::*;
    use crate::config::test_config;
    use crate::middleware::create_session_layer;

    async fn guarded(RequireAdminAuth(admin): RequireAdminAuth) -> String {
        admin.email().to_string()
    }

    #[tokio::test]
    async fn test_anonymous_request_redirects_to_login() {
        let config = test_config();
        let app = Router::new()
            .route("/admin/", get(guarded))
            .layer(create_session_layer(&config))
            .with_state(AppState::new(config).unwrap());

        let response = app
            .oneshot(Request::builder().uri("/admin/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/admin/login");
    }

    #[tokio::test]
    async fn test_missing_session_layer_is_unauthorized() {
        let app = Router::new()
            .route("/", get(guarded))
            .with_state(AppState::new(test_config()).unwrap());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
