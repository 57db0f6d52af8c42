//! Authentication route handlers for admin.
//!
//! Email and password are checked by Firebase; the returned tokens are kept
//! in the session and authorize every write.

use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use rocha_brindes_backend::BackendError;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_admin, login_rate_limiter, set_current_admin};
use crate::models::{CurrentAdmin, Flash, session_keys, set_flash};
use crate::routes::render;
use crate::state::AppState;

/// Shown for any rejected email/password pair.
pub const INVALID_CREDENTIALS: &str = "Email ou senha inválidos";

/// Login page template.
#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginPageTemplate {
    pub base: String,
    pub email: String,
    pub error: Option<String>,
    pub notice: Option<String>,
}

/// Login form fields.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    let sign_in = Router::new()
        .route("/login", post(login))
        .layer(login_rate_limiter());

    Router::new()
        .route("/login", get(login_page))
        .route("/logout", post(logout))
        .merge(sign_in)
}

/// Render the login page, or skip it when already signed in.
///
/// GET /login
#[instrument(skip(state, session))]
async fn login_page(State(state): State<AppState>, session: Session) -> Response {
    let signed_in = session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
        .is_some();
    if signed_in {
        return Redirect::to(&state.config().path("/")).into_response();
    }

    let notice = crate::models::take_flash(&session).await.map(|f| f.message);
    render(&LoginPageTemplate {
        base: state.config().base_path.clone(),
        email: String::new(),
        error: None,
        notice,
    })
    .into_response()
}

/// Sign in with email and password.
///
/// POST /login
#[instrument(skip(state, session, form), fields(email = %form.email))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let email = form.email.trim().to_string();
    let failed = |status: StatusCode, message: &str| {
        (
            status,
            render(&LoginPageTemplate {
                base: state.config().base_path.clone(),
                email: email.clone(),
                error: Some(message.to_string()),
                notice: None,
            }),
        )
            .into_response()
    };

    if email.is_empty() || form.password.is_empty() {
        return failed(StatusCode::UNPROCESSABLE_ENTITY, INVALID_CREDENTIALS);
    }

    match state.auth().sign_in(&email, &form.password).await {
        Ok(auth) => {
            let admin = CurrentAdmin::from(auth);
            // New session id on privilege change
            if let Err(e) = session.cycle_id().await {
                tracing::warn!(error = %e, "Failed to rotate session id");
            }
            if let Err(e) = set_current_admin(&session, &admin).await {
                tracing::error!(error = %e, "Failed to store admin session");
                return failed(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Erro interno. Tente novamente.",
                );
            }
            set_sentry_user(admin.uid(), Some(admin.email()));
            tracing::info!(uid = %admin.uid(), "Admin signed in");
            Redirect::to(&state.config().path("/")).into_response()
        }
        Err(BackendError::Unauthorized(_)) => {
            tracing::info!("Rejected admin sign-in");
            failed(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS)
        }
        Err(BackendError::RateLimited(_)) => failed(
            StatusCode::TOO_MANY_REQUESTS,
            "Muitas tentativas. Aguarde alguns minutos.",
        ),
        Err(e) => {
            tracing::error!(error = %e, "Admin sign-in failed");
            failed(
                StatusCode::BAD_GATEWAY,
                "Não foi possível entrar agora. Tente novamente.",
            )
        }
    }
}

/// Logout and clear session.
///
/// POST /logout
async fn logout(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    // Clear the current admin from session
    let _ = clear_current_admin(&session).await;
    clear_sentry_user();
    set_flash(&session, Flash::success("Você saiu do painel.")).await;

    Redirect::to(&state.config().path("/login"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::routes::tests::app;

    #[tokio::test]
    async fn test_login_page_renders() {
        let response = app()
            .oneshot(Request::builder().uri("/admin/login").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains("action=\"/admin/login\""));
    }

    #[tokio::test]
    async fn test_blank_credentials_are_rejected_locally() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .header("fly-client-ip", "203.0.113.20")
                    .body(Body::from("email=&password="))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains(INVALID_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_logout_returns_to_login() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/admin/login");
    }
}
