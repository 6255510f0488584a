//! Authenticated request wrapper shared by the remote backends.
//!
//! Wraps a `reqwest::Client` with a header-injection scheme, a token store
//! lookup before every call, and an optional refresh handler. On an
//! authorization failure the refresher is invoked at most once, the new
//! token is persisted, and the original request is retried exactly once.

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use std::sync::Arc;

use omnidisk_common::{Error, Result};

use crate::token::TokenStore;

/// How the credential is injected into the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// `Authorization: OAuth <token>`
    OAuth,
}

impl AuthScheme {
    fn header_value(&self, token: &str) -> String {
        match self {
            AuthScheme::Bearer => format!("Bearer {}", token),
            AuthScheme::OAuth => format!("OAuth {}", token),
        }
    }
}

/// Exchanges the configured long-lived credential for a fresh token.
///
/// Credential state is held by the implementation, passed in at
/// construction; there is no ambient signed-in-user state.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String>;
}

/// HTTP client decorator that authenticates every request.
///
/// Backend-agnostic: adapters supply the scheme, the token store and an
/// optional refresher. Fixed query parameters (e.g. an API key) can be
/// appended to every outgoing request.
pub struct AuthorizedClient {
    http: reqwest::Client,
    scheme: AuthScheme,
    tokens: Arc<dyn TokenStore>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    base_query: Vec<(String, String)>,
    /// One in-flight refresh at a time; waiters reuse the stored result.
    refresh_gate: tokio::sync::Mutex<()>,
}

impl AuthorizedClient {
    pub fn new(
        http: reqwest::Client,
        scheme: AuthScheme,
        tokens: Arc<dyn TokenStore>,
        refresher: Option<Arc<dyn TokenRefresher>>,
    ) -> Self {
        Self {
            http,
            scheme,
            tokens,
            refresher,
            base_query: Vec::new(),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Append a fixed query parameter to every request sent through this
    /// client.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.base_query.push((key.into(), value.into()));
        self
    }

    /// The token store this client authenticates with.
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Start building a request against the underlying client.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http.request(method, url)
    }

    /// Send an authenticated request, refreshing and retrying once on an
    /// authorization failure.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let request = if self.base_query.is_empty() {
            request
        } else {
            request.query(&self.base_query)
        };
        let retry = request.try_clone();

        let token = self.current_token().await?;
        let response = request
            .header(header::AUTHORIZATION, self.scheme.header_value(&token))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("request failed: {}", e)))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check_status(response).await;
        }

        let denied = || Error::NotAuthorized("backend rejected the credential".to_string());

        let Some(retry) = retry else {
            return Err(denied());
        };
        if self.refresher.is_none() {
            return Err(denied());
        }

        // Refresh failure propagates the original authorization failure.
        let fresh = self.refreshed_token(&token).await.map_err(|_| denied())?;

        let response = retry
            .header(header::AUTHORIZATION, self.scheme.header_value(&fresh))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("retried request failed: {}", e)))?;

        Self::check_status(response).await
    }

    /// Send a request and decode the JSON response body.
    pub async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.execute(request).await?;
        response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("failed to decode response: {}", e)))
    }

    /// Send a request and return the raw response body.
    pub async fn fetch_bytes(&self, request: RequestBuilder) -> Result<Vec<u8>> {
        let response = self.execute(request).await?;
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| Error::Transport(format!("failed to read response body: {}", e)))
    }

    async fn current_token(&self) -> Result<String> {
        if let Some(token) = self.tokens.token() {
            return Ok(token);
        }
        if self.refresher.is_some() {
            // No stored credential; the refresher may still mint one.
            return self.refreshed_token("").await;
        }
        Err(Error::NotAuthorized("no stored credential".to_string()))
    }

    async fn refreshed_token(&self, stale: &str) -> Result<String> {
        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited for the gate.
        if let Some(current) = self.tokens.token() {
            if current != stale {
                return Ok(current);
            }
        }

        let refresher = self
            .refresher
            .as_ref()
            .ok_or_else(|| Error::NotAuthorized("no refresh handler configured".to_string()))?;

        tracing::info!("refreshing rejected access token");
        let fresh = refresher.refresh().await?;
        self.tokens.save_token(&fresh)?;
        Ok(fresh)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => Error::NotFound(body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Error::NotAuthorized(format!("{}: {}", status, body))
            }
            StatusCode::CONFLICT => Error::AlreadyExists(body),
            _ => Error::Transport(format!("API error: {} - {}", status, body)),
        })
    }
}
