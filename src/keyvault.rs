//! Key Vault secret client
//!
//! Minimal client for reading one named secret from a vault. Authentication
//! uses a credential chain: an ordered list of credential sources tried in
//! sequence until one yields a token. The only wired source is the app's
//! own registered client credential (client-credentials grant), matching
//! how the sample authenticates to the vault - with the application's
//! identity, not the signed-in user's token.

use anyhow::{Context, Result};
use async_trait::async_trait;
use oauth2::{basic::BasicClient, ClientId, ClientSecret, Scope, TokenResponse, TokenUrl};
use serde::Deserialize;
use std::sync::Arc;

/// Scope for vault data-plane tokens
pub const VAULT_SCOPE: &str = "https://vault.azure.net/.default";

const API_VERSION: &str = "7.4";

/// A source of bearer tokens for downstream resource calls
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scope: &str) -> Result<String>;
}

/// Client-credentials grant against the authority token endpoint
pub struct ClientSecretCredential {
    authority: String,
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

impl ClientSecretCredential {
    pub fn new(
        tenant_id: String,
        client_id: String,
        client_secret: String,
        http: reqwest::Client,
    ) -> Self {
        Self {
            authority: format!("https://login.microsoftonline.com/{}", tenant_id),
            client_id,
            client_secret,
            http,
        }
    }

    /// Override the authority base URL (sovereign clouds, custom settings)
    pub fn with_authority(mut self, authority: &str) -> Self {
        self.authority = authority.trim_end_matches('/').to_string();
        self
    }

    fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority)
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self, scope: &str) -> Result<String> {
        let token_url =
            TokenUrl::new(self.token_endpoint()).context("Invalid token endpoint URL")?;

        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_token_uri(token_url);

        tracing::debug!(scope = %scope, "Requesting app-identity token");
        let response = client
            .exchange_client_credentials()
            .add_scope(Scope::new(scope.to_string()))
            .request_async(&self.http)
            .await
            .context("Client-credentials token request failed")?;

        Ok(response.access_token().secret().clone())
    }
}

/// Ordered list of credential sources tried in sequence until one succeeds
pub struct ChainedTokenCredential {
    sources: Vec<Arc<dyn TokenCredential>>,
}

impl ChainedTokenCredential {
    pub fn new(sources: Vec<Arc<dyn TokenCredential>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl TokenCredential for ChainedTokenCredential {
    async fn get_token(&self, scope: &str) -> Result<String> {
        let mut failures = Vec::new();

        for (index, source) in self.sources.iter().enumerate() {
            match source.get_token(scope).await {
                Ok(token) => {
                    tracing::debug!(index = index, "Credential chain source succeeded");
                    return Ok(token);
                }
                Err(e) => {
                    tracing::warn!(index = index, error = %e, "Credential chain source failed");
                    failures.push(format!("source {}: {}", index, e));
                }
            }
        }

        anyhow::bail!(
            "All credential sources failed: [{}]",
            failures.join("; ")
        )
    }
}

/// Secret returned by the vault
#[derive(Debug, Clone, Deserialize)]
pub struct KvSecret {
    pub value: String,
    #[serde(default)]
    pub id: Option<String>,
}

pub struct SecretClient {
    vault_url: String,
    credential: Arc<dyn TokenCredential>,
    http: reqwest::Client,
}

impl SecretClient {
    pub fn new(
        vault_url: &str,
        credential: Arc<dyn TokenCredential>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            vault_url: vault_url.trim_end_matches('/').to_string(),
            credential,
            http,
        }
    }

    fn secret_url(&self, name: &str) -> String {
        format!(
            "{}/secrets/{}?api-version={}",
            self.vault_url, name, API_VERSION
        )
    }

    /// Fetch one named secret from the vault
    pub async fn get_secret(&self, name: &str) -> Result<KvSecret> {
        let token = self.credential.get_token(VAULT_SCOPE).await?;
        let url = self.secret_url(name);

        tracing::info!(vault_url = %self.vault_url, secret_name = %name, "Fetching secret");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .context("Vault request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Vault returned {}: {}", status, body);
        }

        response.json().await.context("Failed to parse vault response")
    }
}
