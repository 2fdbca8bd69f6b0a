//! Client for the hosted identity provider.
//!
//! Email/password sign-in yields an access token, an optional refresh
//! token, and the user record; profile names live in the user's metadata
//! object and are updated through the same endpoint that serves the
//! record.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::types::{StoredSession, UserProfile};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AuthError {
    pub code: String,
    pub message: String,
}

impl AuthError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        AuthError {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_invalid_credentials(&self) -> bool {
        self.code == "invalid_credentials" || self.code == "invalid_grant"
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for AuthError {}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl AuthConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        AuthConfig {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Names to write into the user's metadata; `None` leaves a field as-is.
#[derive(Debug, Clone, Default)]
pub struct ProfileNames {
    pub full_name: Option<String>,
    pub display_name: Option<String>,
}

pub struct AuthClient {
    config: AuthConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct WireSession {
    access_token: String,
    refresh_token: Option<String>,
    user: WireUser,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: WireMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct WireMetadata {
    full_name: Option<String>,
    display_name: Option<String>,
}

impl From<WireUser> for UserProfile {
    fn from(user: WireUser) -> Self {
        UserProfile {
            id: user.id,
            email: user.email,
            full_name: user.user_metadata.full_name,
            display_name: user.user_metadata.display_name,
        }
    }
}

impl From<WireSession> for StoredSession {
    fn from(session: WireSession) -> Self {
        StoredSession {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            user: session.user.into(),
        }
    }
}

impl AuthClient {
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| AuthError::new("CLIENT_INIT", err.to_string()))?;
        Ok(AuthClient { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/auth/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            path
        )
    }

    fn request(&self, method: reqwest::Method, url: &str, bearer: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(bearer)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, AuthError> {
        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                AuthError::new("TIMEOUT", err.to_string())
            } else if err.is_connect() {
                AuthError::new("CONNECT_FAILED", err.to_string())
            } else {
                AuthError::new("REQUEST_FAILED", err.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status, &body))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AuthError> {
        response
            .json()
            .await
            .map_err(|err| AuthError::new("BAD_RESPONSE", err.to_string()))
    }

    /// Exchange email/password for a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<StoredSession, AuthError> {
        let url = format!("{}?grant_type=password", self.endpoint("token"));
        debug!(url = %url, "auth sign-in");
        let response = self
            .send(
                self.request(reqwest::Method::POST, &url, &self.config.api_key)
                    .json(&serde_json::json!({ "email": email, "password": password })),
            )
            .await?;
        let session: WireSession = Self::read_json(response).await?;
        Ok(session.into())
    }

    /// Trade a refresh token for a fresh session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<StoredSession, AuthError> {
        let url = format!("{}?grant_type=refresh_token", self.endpoint("token"));
        debug!(url = %url, "auth refresh");
        let response = self
            .send(
                self.request(reqwest::Method::POST, &url, &self.config.api_key)
                    .json(&serde_json::json!({ "refresh_token": refresh_token })),
            )
            .await?;
        let session: WireSession = Self::read_json(response).await?;
        Ok(session.into())
    }

    /// Current user for an access token. Doubles as a session validity
    /// check.
    pub async fn fetch_user(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        let url = self.endpoint("user");
        let response = self
            .send(self.request(reqwest::Method::GET, &url, access_token))
            .await?;
        let user: WireUser = Self::read_json(response).await?;
        Ok(user.into())
    }

    /// Write profile names into the user's metadata and return the
    /// updated record.
    pub async fn update_profile_names(
        &self,
        access_token: &str,
        names: &ProfileNames,
    ) -> Result<UserProfile, AuthError> {
        let mut data = serde_json::Map::new();
        if let Some(full_name) = &names.full_name {
            data.insert("full_name".into(), serde_json::json!(full_name));
        }
        if let Some(display_name) = &names.display_name {
            data.insert("display_name".into(), serde_json::json!(display_name));
        }

        let url = self.endpoint("user");
        let response = self
            .send(
                self.request(reqwest::Method::PUT, &url, access_token)
                    .json(&serde_json::json!({ "data": data })),
            )
            .await?;
        let user: WireUser = Self::read_json(response).await?;
        Ok(user.into())
    }

    /// Revoke the session server-side. A failure only means the token
    /// keeps working until it expires, so callers may treat it as soft.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let url = self.endpoint("logout");
        self.send(self.request(reqwest::Method::POST, &url, access_token))
            .await?;
        Ok(())
    }
}

/// The provider reports errors in a couple of shapes; prefer the newer
/// `error_code`/`msg` pair, then the OAuth-style fields.
fn error_from_body(status: reqwest::StatusCode, body: &str) -> AuthError {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body) {
        let code = parsed
            .get("error_code")
            .or_else(|| parsed.get("error"))
            .and_then(|value| value.as_str())
            .unwrap_or_else(|| status.as_str())
            .to_string();
        let message = parsed
            .get("msg")
            .or_else(|| parsed.get("error_description"))
            .or_else(|| parsed.get("message"))
            .and_then(|value| value.as_str())
            .unwrap_or(body)
            .to_string();
        return AuthError { code, message };
    }

    AuthError::new(status.as_str(), body.trim().to_string())
}
