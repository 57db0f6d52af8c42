//! HTTP route handlers for admin.
//!
//! Every path below is relative to the configured base path (`/admin` by
//! default).
//!
//! # Route Structure
//!
//! ```text
//! # Auth (Firebase email/password)
//! GET  /login                          - Login page
//! POST /login                          - Sign in (rate limited)
//! POST /logout                         - Sign out
//!
//! # Dashboard
//! GET  /                               - Overview counts
//!
//! # Products
//! GET  /produtos                       - Product list, 50 per page (?apos=cursor)
//! GET  /produtos/novo                  - New product form (?pasta=picker folder)
//! POST /produtos/novo                  - Create product (multipart)
//! GET  /produtos/{id}/editar           - Edit form
//! POST /produtos/{id}/editar           - Replace product (multipart)
//! POST /produtos/{id}/excluir          - Delete product document
//!
//! # Categories
//! GET  /categorias                     - Category list and create form
//! POST /categorias                     - Create category (multipart)
//! POST /categorias/{id}/excluir        - Delete category
//! POST /categorias/{id}/popular        - Set the popular flag
//! POST /categorias/{id}/imagem         - Replace the image (multipart)
//!
//! # Homepage layout
//! GET  /layout                         - Logo, banners, promotions, popups
//! POST /layout/logo                    - Upload logo (multipart)
//! POST /layout/logo/remover            - Remove logo
//! POST /layout/{kind}                  - Append uploads to a list (multipart)
//! POST /layout/{kind}/{index}/remover  - Remove one entry
//!
//! # Storage
//! GET  /armazenamento                  - Browse uploaded files (?pasta=)
//! ```

pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod forms;
pub mod layout;
pub mod products;
pub mod storage;

use askama::Template;
use axum::{
    Router,
    response::{Html, Redirect},
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentAdmin, Flash, set_flash, take_flash};
use crate::state::AppState;

pub use dashboard::AdminUserView;

/// Data every signed-in page needs for the shared layout.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub admin_user: AdminUserView,
    /// Admin base path, prefixed to every link.
    pub base: String,
    /// Path of this page below the base, for the active nav item.
    pub current_path: String,
    pub flash: Option<Flash>,
}

impl PageContext {
    /// Build the context and consume the pending flash message.
    pub async fn new(
        state: &AppState,
        session: &Session,
        admin: &CurrentAdmin,
        current_path: &str,
    ) -> Self {
        Self {
            admin_user: AdminUserView::from(admin),
            base: state.config().base_path.clone(),
            current_path: current_path.to_string(),
            flash: take_flash(session).await,
        }
    }

    /// Whether the nav item for `section` is the current page.
    #[must_use]
    pub fn is_active(&self, section: &str) -> bool {
        if section == "/" {
            self.current_path == "/"
        } else {
            self.current_path.starts_with(section)
        }
    }
}

/// Finish a write: flash the outcome and redirect.
///
/// Errors are logged (server-side ones also go to Sentry) and shown to the
/// operator as an error flash.
pub async fn finish_write(
    session: &Session,
    to: &str,
    context: &str,
    outcome: Result<String, AppError>,
) -> Redirect {
    let flash = match outcome {
        Ok(message) => Flash::success(message),
        Err(e) => {
            e.report(context);
            Flash::error(e.user_message())
        }
    };
    set_flash(session, flash).await;
    Redirect::to(to)
}

/// Render a page, logging template failures instead of panicking.
pub fn render<T: Template>(template: &T) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {e}");
        "Internal Server Error".to_string()
    }))
}

/// Milliseconds since the epoch, used to name uploads.
#[must_use]
pub fn upload_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Create all admin routes, relative to the base path.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(products::router())
        .merge(categories::router())
        .merge(layout::router())
        .merge(storage::router())
}
