//! Unified error handling for admin.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rocha_brindes_backend::BackendError;
use rocha_brindes_core::ValidationError;
use thiserror::Error;

use crate::services::images::ImageError;

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// Firebase operation failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Form input rejected before any write.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Uploaded file could not be processed.
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Backend(BackendError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Backend(BackendError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            Self::Backend(BackendError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) | Self::Image(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether this failure is ours rather than the operator's.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    /// Message shown to the operator, in Portuguese.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Image(e) => format!("Imagem inválida: {e}"),
            Self::BadRequest(msg) => msg.clone(),
            Self::NotFound(_) | Self::Backend(BackendError::NotFound(_)) => {
                "Registro não encontrado.".to_string()
            }
            Self::Backend(BackendError::Unauthorized(_)) => {
                "Sessão expirada. Entre novamente.".to_string()
            }
            Self::Backend(BackendError::Status { status: 403, .. }) => {
                "Sem permissão para esta operação.".to_string()
            }
            Self::Backend(BackendError::RateLimited(_)) => {
                "Muitas requisições. Aguarde alguns instantes.".to_string()
            }
            Self::Backend(_) => "Falha ao comunicar com o Firebase. Tente novamente.".to_string(),
            Self::Session(_) | Self::Internal(_) => "Erro interno. Tente novamente.".to_string(),
        }
    }

    /// Log the error, and send server-side failures to Sentry.
    pub fn report(&self, context: &str) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "{context}"
            );
        } else {
            tracing::warn!(error = %self, "{context}");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report("Admin request error");
        (self.status(), self.user_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from the signed-in admin.
pub fn set_sentry_user(uid: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(uid.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
