//! OAuth2 token refresh for the Google Drive backend.

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    ClientId, ClientSecret, EndpointNotSet, EndpointSet, RefreshToken, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};

use omnidisk_common::{Error, Result};

use crate::auth::TokenRefresher;

/// Google OAuth2 token endpoint.
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Explicit OAuth2 credential for the Drive backend.
///
/// Passed in at construction; there is no ambient signed-in-user state. The
/// refresh token is the long-lived credential obtained by the (external)
/// sign-in flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Token endpoint override (tests); defaults to the Google endpoint.
    #[serde(default)]
    pub token_url: Option<String>,
}

type RefreshEndpoint =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Exchanges the configured refresh token for a fresh access token.
pub struct GoogleTokenRefresher {
    oauth: RefreshEndpoint,
    http: reqwest::Client,
    refresh_token: RefreshToken,
}

impl GoogleTokenRefresher {
    pub fn new(config: GoogleAuthConfig, http: reqwest::Client) -> Result<Self> {
        let token_url = config
            .token_url
            .unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string());
        let token_url = TokenUrl::new(token_url)
            .map_err(|e| Error::InvalidInput(format!("invalid token URL: {}", e)))?;

        let oauth = BasicClient::new(ClientId::new(config.client_id))
            .set_client_secret(ClientSecret::new(config.client_secret))
            .set_token_uri(token_url);

        Ok(Self {
            oauth,
            http,
            refresh_token: RefreshToken::new(config.refresh_token),
        })
    }
}

#[async_trait]
impl TokenRefresher for GoogleTokenRefresher {
    async fn refresh(&self) -> Result<String> {
        let response = self
            .oauth
            .exchange_refresh_token(&self.refresh_token)
            .request_async(&self.http)
            .await
            .map_err(|e| Error::NotAuthorized(format!("token refresh failed: {}", e)))?;

        Ok(response.access_token().secret().clone())
    }
}
