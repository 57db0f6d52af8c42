//! Shared response handling for the Firebase REST APIs.

use serde::Deserialize;

use crate::BackendError;

/// Google APIs wrap failures as `{"error": {"code": .., "message": ..}}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Pull the human-readable message out of an error body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| truncate(body, 200))
}

/// Read a response body, mapping failure statuses to [`BackendError`].
pub async fn read_body(response: reqwest::Response, what: &str) -> Result<String, BackendError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(BackendError::RateLimited(retry_after));
    }

    let body = response.text().await?;

    if status.is_success() {
        return Ok(body);
    }

    let message = error_message(&body);
    match status {
        reqwest::StatusCode::NOT_FOUND => Err(BackendError::NotFound(what.to_string())),
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            Err(BackendError::Unauthorized(message))
        }
        _ => {
            tracing::error!(
                status = %status,
                body = %truncate(&body, 500),
                "Firebase returned non-success status"
            );
            Err(BackendError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Parse a JSON body, logging the payload when it does not fit `T`.
pub fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %truncate(body, 500),
            "Failed to parse Firebase response"
        );
        BackendError::Parse(e)
    })
}
