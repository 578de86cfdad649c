//! OAuth2 client wrapper for the identity provider
//!
//! Thin wrapper over the `oauth2` crate: builds the authorization URL for
//! sign-in, exchanges the callback code for tokens, and performs the silent
//! (non-interactive) refresh used before the graph call. All protocol work
//! is the crate's; this module only configures endpoints and maps results.

use anyhow::{Context, Result};
use oauth2::{
    basic::{BasicErrorResponseType, BasicTokenType},
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointSet, ExtraTokenFields,
    RedirectUrl, RefreshToken, Scope, StandardErrorResponse, StandardRevocableToken,
    StandardTokenIntrospectionResponse, StandardTokenResponse, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::settings::AadSettings;

/// Custom extra fields to capture id_token from the OIDC token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcTokenFields {
    pub id_token: Option<String>,
}

impl ExtraTokenFields for OidcTokenFields {}

/// Type alias for our configured OAuth client with OIDC support
type ConfiguredOAuthClient = oauth2::Client<
    StandardErrorResponse<BasicErrorResponseType>,
    StandardTokenResponse<OidcTokenFields, BasicTokenType>,
    StandardTokenIntrospectionResponse<OidcTokenFields, BasicTokenType>,
    StandardRevocableToken,
    StandardErrorResponse<oauth2::RevocationErrorResponseType>,
    EndpointSet,            // HasAuthUrl
    oauth2::EndpointNotSet, // HasDeviceAuthUrl
    oauth2::EndpointNotSet, // HasIntrospectionUrl
    oauth2::EndpointNotSet, // HasRevocationUrl
    EndpointSet,            // HasTokenUrl
>;

/// Tokens produced by a code exchange or a silent refresh
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
}

pub struct IdentityClient {
    settings: Arc<AadSettings>,
    http: reqwest::Client,
}

impl IdentityClient {
    pub fn new(
        settings: Arc<AadSettings>,
        connect_timeout_secs: u64,
        request_timeout_secs: u64,
    ) -> Result<Self> {
        // No redirect following on token-endpoint calls
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()
            .context("Failed to build HTTP client for identity provider")?;

        Ok(Self { settings, http })
    }

    fn oauth_client(&self, redirect_uri: &str) -> Result<ConfiguredOAuthClient> {
        let auth_url = AuthUrl::new(self.settings.authorize_endpoint())
            .map_err(|e| anyhow::anyhow!("Invalid authorize URL: {}", e))?;
        let token_url = TokenUrl::new(self.settings.token_endpoint())
            .map_err(|e| anyhow::anyhow!("Invalid token URL: {}", e))?;
        let redirect_url = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| anyhow::anyhow!("Invalid redirect URL: {}", e))?;

        Ok(oauth2::Client::new(ClientId::new(self.settings.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.settings.client_credential.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url))
    }

    /// Build the authorization URL for the sign-in redirect.
    ///
    /// Requests the OIDC scope set plus the resource scopes from settings
    /// (`offline_access` yields the refresh token the silent refresh needs).
    pub fn authorize_redirect(&self, redirect_uri: &str) -> Result<(url::Url, CsrfToken)> {
        let client = self.oauth_client(redirect_uri)?;

        let mut request = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .add_scope(Scope::new("offline_access".to_string()));
        for scope in &self.settings.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = request.url();
        Ok((auth_url, csrf_token))
    }

    /// Exchange the callback authorization code for tokens
    pub async fn exchange_code(&self, code: String, redirect_uri: &str) -> Result<TokenSet> {
        let client = self.oauth_client(redirect_uri)?;

        let token_response = client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&self.http)
            .await
            .context("Token exchange failed")?;

        Ok(Self::token_set(&token_response))
    }

    /// Silent (non-interactive) token refresh using the cached refresh token.
    ///
    /// Fails when no refresh token was cached at sign-in; callers let that
    /// failure propagate.
    pub async fn acquire_token_silently(&self, refresh_token: &str) -> Result<TokenSet> {
        let client = self.oauth_client(&format!(
            "https://localhost{}",
            self.settings.redirect_path
        ))?;

        tracing::debug!("Attempting silent token refresh");
        let token_response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .context("Silent token refresh failed")?;

        Ok(Self::token_set(&token_response))
    }

    fn token_set(response: &StandardTokenResponse<OidcTokenFields, BasicTokenType>) -> TokenSet {
        TokenSet {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            id_token: response.extra_fields().id_token.clone(),
        }
    }
}
