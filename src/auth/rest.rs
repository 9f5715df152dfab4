//! REST implementation of [`AuthBackend`] against the hosted auth service.
//!
//! The service exposes a GoTrue-style surface under `/auth/v1`:
//! password and PKCE grants on the token endpoint, signup, and logout.
//! Username uniqueness is checked against the `profiles` table under
//! `/rest/v1`, the same query the signup page issued.

use chrono::{Duration, Utc};
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::debug;

use async_trait::async_trait;

use crate::config::Config;

use super::{AuthBackend, AuthError, Provider, Session, User};

/// HTTP request timeout in seconds.
/// 30s allows for slow responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Fallback session lifetime when the token response omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: String,
    #[serde(default)]
    user_metadata: UserMetadata,
    #[serde(default)]
    app_metadata: AppMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    username: Option<String>,
    #[serde(default, rename = "full_name")]
    full_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AppMetadata {
    #[serde(default)]
    provider: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    access_token: Option<String>,
    // Present when signup returns a bare (unconfirmed) user object.
    #[serde(default)]
    identities: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[allow(dead_code)]
    username: String,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let provider = match self.user.app_metadata.provider.as_deref() {
            Some("google") => Provider::Google,
            Some("facebook") => Provider::Facebook,
            _ => Provider::Email,
        };
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
            user: User {
                id: self.user.id,
                email: self.user.email,
                username: self.user.user_metadata.username,
                display_name: self.user.user_metadata.full_name,
                provider,
            },
        }
    }
}

/// Auth backend speaking to the hosted service over HTTPS.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RestAuthBackend {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl RestAuthBackend {
    pub fn new(config: &Config) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
            anon_key: config.anon_key.clone(),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn token_request(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, AuthError> {
        let url = format!("{}?grant_type={}", self.auth_url("token"), grant_type);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(grant_type, status = %status, "Token request rejected");
            return Err(AuthError::from_token_response(status, &body));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        Ok(token.into_session())
    }
}

#[async_trait]
impl AuthBackend for RestAuthBackend {
    async fn password_grant(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.token_request(
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<Option<Session>, AuthError> {
        let response = self
            .client
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": { "username": username, "email_verified": false },
            }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            if text.contains("already registered") || text.contains("already exists") {
                return Err(AuthError::EmailTaken);
            }
            return Err(AuthError::from_token_response(status, &text));
        }

        let parsed: SignUpResponse = serde_json::from_str(&text)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        // An existing confirmed email comes back as a user with no
        // identities rather than an error.
        if matches!(&parsed.identities, Some(ids) if ids.is_empty()) {
            return Err(AuthError::EmailTaken);
        }

        if parsed.access_token.is_some() {
            let token: TokenResponse = serde_json::from_str(&text)
                .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
            return Ok(Some(token.into_session()));
        }

        // Confirmation email pending; no session yet.
        Ok(None)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        let url = format!(
            "{}/rest/v1/profiles?select=username&username=ilike.{}",
            self.base_url, username
        );
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.anon_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::InvalidResponse(format!(
                "profiles lookup failed with {}: {}",
                status, body
            )));
        }

        let rows: Vec<ProfileRow> = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        Ok(!rows.is_empty())
    }

    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<Session, AuthError> {
        self.token_request(
            "pkce",
            serde_json::json!({ "auth_code": code, "code_verifier": verifier }),
        )
        .await
    }

    async fn revoke(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        // 401 here means the session was already gone server-side, which is
        // the outcome sign-out wants anyway.
        let status = response.status();
        if !status.is_success() && status.as_u16() != 401 {
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, "Logout rejected");
            return Err(AuthError::ExchangeFailed(body));
        }
        Ok(())
    }
}
