//! REST client for the hosted database.
//!
//! The backend exposes tables under `/rest/v1/{table}` with query-string
//! operators (`order=`, `column=eq.value`) and the public API key on every
//! request. Reads work anonymously; writes carry the signed-in user's
//! bearer token so row-level security can enforce ownership server-side.

use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::auth::IdentityClient;
use crate::config::Config;

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for the hosted database's REST surface.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct DataClient {
    client: Client,
    base_url: String,
    anon_key: String,
    token: Option<String>,
}

impl DataClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
            anon_key: config.anon_key.clone(),
            token: None,
        })
    }

    /// Create a client carrying the given access token, sharing the
    /// connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            anon_key: self.anon_key.clone(),
            token: Some(token),
        }
    }

    /// Create a client authorized as the identity client's current session,
    /// if there is one.
    pub fn for_session(&self, identity: &IdentityClient) -> Self {
        match identity.current_session() {
            Some(session) => self.with_token(session.access_token),
            None => self.clone(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn table_url(&self, table: &str, query: &[(&str, &str)]) -> String {
        let mut url = format!("{}/rest/v1/{}", self.base_url, table);
        let mut sep = '?';
        for (key, value) in query {
            url.push(sep);
            url.push_str(key);
            url.push('=');
            url.push_str(value);
            sep = '&';
        }
        url
    }

    fn headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "apikey",
            header::HeaderValue::from_str(&self.anon_key)
                .map_err(|e| ApiError::InvalidResponse(e.to_string()))?,
        );
        // Anonymous reads still authenticate as the public role.
        let bearer = self.token.as_deref().unwrap_or(&self.anon_key);
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", bearer))
                .map_err(|e| ApiError::InvalidResponse(e.to_string()))?,
        );
        Ok(headers)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Fetch rows from a table.
    ///
    /// `query` holds raw PostgREST operators, e.g.
    /// `[("select", "*"), ("order", "created_at.desc")]`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ApiError> {
        let url = self.table_url(table, query);
        debug!(table, "Fetching rows");
        let response = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await?;
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("{} rows: {}", table, e)))
    }

    /// Insert a row, returning the stored representation (with the
    /// server-assigned id and timestamps).
    pub async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<R, ApiError> {
        self.require_auth()?;
        let url = self.table_url(table, &[]);
        debug!(table, "Inserting row");
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let mut rows: Vec<R> = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("{} insert: {}", table, e)))?;
        rows.pop()
            .ok_or_else(|| ApiError::InvalidResponse(format!("{} insert returned no rows", table)))
    }

    /// Patch rows matching the filters. Writes are scoped to the owner by
    /// filter; the backend re-checks ownership regardless.
    pub async fn update<T: Serialize>(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        patch: &T,
    ) -> Result<(), ApiError> {
        self.require_auth()?;
        let url = self.table_url(table, filters);
        debug!(table, "Updating rows");
        let response = self
            .client
            .patch(&url)
            .headers(self.headers()?)
            .json(patch)
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    /// Delete rows matching the filters.
    pub async fn delete(&self, table: &str, filters: &[(&str, &str)]) -> Result<(), ApiError> {
        self.require_auth()?;
        let url = self.table_url(table, filters);
        debug!(table, "Deleting rows");
        let response = self
            .client
            .delete(&url)
            .headers(self.headers()?)
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    fn require_auth(&self) -> Result<(), ApiError> {
        if self.token.is_none() {
            return Err(ApiError::Unauthenticated);
        }
        Ok(())
    }
}
