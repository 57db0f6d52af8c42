//! Identity Toolkit REST client for admin sign-in.
//!
//! The ID token from a password sign-in authorizes every Firestore and
//! Storage write. It lives for about an hour; the refresh token trades for
//! a new one without asking for the password again.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::config::FirebaseConfig;
use crate::http::{error_message, parse_json};
use crate::BackendError;

const SIGN_IN_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";
const REFRESH_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A signed-in admin's tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Firebase user id.
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AuthSession {
    /// Whether the ID token is expired or about to be.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
    id_token: String,
    refresh_token: String,
    /// Seconds, as a decimal string.
    expires_in: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    user_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

fn expiry(now: DateTime<Utc>, expires_in: &str) -> DateTime<Utc> {
    let secs = expires_in.parse::<i64>().unwrap_or(3600);
    now + Duration::seconds(secs)
}

/// Client for Firebase email/password authentication.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthClientInner>,
}

struct AuthClientInner {
    client: reqwest::Client,
    api_key: String,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: &FirebaseConfig) -> Self {
        Self {
            inner: Arc::new(AuthClientInner {
                client: reqwest::Client::new(),
                api_key: config.api_key.expose_secret().to_string(),
            }),
        }
    }

    fn endpoint(&self, base: &str) -> Result<Url, BackendError> {
        let mut url =
            Url::parse(base).map_err(|e| BackendError::Decode(format!("invalid auth URL: {e}")))?;
        url.query_pairs_mut().append_pair("key", &self.inner.api_key);
        Ok(url)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] for wrong credentials or a
    /// disabled account, or an error if the request fails.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let response = self
            .inner
            .client
            .post(self.endpoint(SIGN_IN_URL)?)
            .json(&SignInRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let body = read_auth_body(response).await?;
        let data: SignInResponse = parse_json(&body)?;
        Ok(AuthSession {
            uid: data.local_id,
            email: data.email,
            id_token: data.id_token,
            refresh_token: data.refresh_token,
            expires_at: expiry(Utc::now(), &data.expires_in),
        })
    }

    /// Trade the refresh token for a fresh ID token.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] if the refresh token was
    /// revoked or the account disabled.
    #[instrument(skip(self, session), fields(uid = %session.uid))]
    pub async fn refresh(&self, session: &AuthSession) -> Result<AuthSession, BackendError> {
        let response = self
            .inner
            .client
            .post(self.endpoint(REFRESH_URL)?)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ])
            .send()
            .await?;

        let body = read_auth_body(response).await?;
        let data: RefreshResponse = parse_json(&body)?;
        Ok(AuthSession {
            uid: data.user_id,
            email: session.email.clone(),
            id_token: data.id_token,
            refresh_token: data.refresh_token,
            expires_at: expiry(Utc::now(), &data.expires_in),
        })
    }
}

/// Identity Toolkit reports bad credentials as 400 with a code in the
/// message (`INVALID_LOGIN_CREDENTIALS`, `INVALID_PASSWORD`, ...).
async fn read_auth_body(response: reqwest::Response) -> Result<String, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }
    let message = error_message(&body);
    if status.is_client_error() {
        return Err(BackendError::Unauthorized(message));
    }
    Err(BackendError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn session(expires_at: DateTime<Utc>) -> AuthSession {
        AuthSession {
            uid: "uid-1".to_string(),
            email: "admin@rochabrindes.com".to_string(),
            id_token: "id-token-value".to_string(),
            refresh_token: "refresh-token-value".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_needs_refresh_inside_margin() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert!(!session(now + Duration::minutes(30)).needs_refresh(now));
        assert!(session(now + Duration::seconds(30)).needs_refresh(now));
        assert!(session(now - Duration::seconds(1)).needs_refresh(now));
    }

    #[test]
    fn test_expiry_parses_seconds() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(expiry(now, "3600"), now + Duration::hours(1));
        assert_eq!(expiry(now, "bogus"), now + Duration::hours(1));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug_output = format!("{:?}", session(Utc::now()));
        assert!(debug_output.contains("admin@rochabrindes.com"));
        assert!(!debug_output.contains("id-token-value"));
        assert!(!debug_output.contains("refresh-token-value"));
    }

    #[test]
    fn test_sign_in_response_parses() {
        let data: SignInResponse = serde_json::from_str(
            r#"{
                "kind": "identitytoolkit#VerifyPasswordResponse",
                "localId": "uid-1",
                "email": "admin@rochabrindes.com",
                "displayName": "",
                "idToken": "a",
                "registered": true,
                "refreshToken": "b",
                "expiresIn": "3600"
            }"#,
        )
        .unwrap();
        assert_eq!(data.local_id, "uid-1");
        assert_eq!(data.expires_in, "3600");
    }
}
