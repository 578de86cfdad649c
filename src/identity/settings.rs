//! Identity-provider client settings
//!
//! Parsed once at startup from an external JSON file (`aad.config.json` by
//! default). The file describes the registered application: client id,
//! tenant, client credential, redirect path, and the scopes requested at
//! sign-in. Settings are immutable after the startup sanity check.

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

fn default_redirect_path() -> String {
    "/auth/redirect".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["User.Read".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct AadSettings {
    pub client_id: String,
    pub tenant_id: String,
    pub client_credential: String,
    /// Authority base URL; derived from the tenant when absent
    #[serde(default)]
    pub authority: Option<String>,
    #[serde(default = "default_redirect_path")]
    pub redirect_path: String,
    /// Resource scopes requested at sign-in, in addition to the OIDC set
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

impl AadSettings {
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read identity settings file '{}'", path))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse identity settings JSON")
    }

    /// Authority base URL without a trailing slash
    pub fn authority(&self) -> String {
        match &self.authority {
            Some(authority) => authority.trim_end_matches('/').to_string(),
            None => format!("https://login.microsoftonline.com/{}", self.tenant_id),
        }
    }

    pub fn authorize_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.authority())
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority())
    }

    pub fn end_session_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/logout", self.authority())
    }

    /// Replace the file credential with one supplied by the deployment
    /// platform. Only called in production mode; the process environment is
    /// the sole trusted source for the override.
    pub fn apply_secure_credential(&mut self, secure_client_credential: &str) {
        tracing::info!("Using client credential supplied by the environment");
        self.client_credential = secure_client_credential.to_string();
    }

    /// Validate the settings before any of them are used.
    ///
    /// Mirrors the startup checks of the original identity helper: non-empty
    /// client id, tenant, and credential, an authority that parses as an
    /// HTTPS URL, and a host-relative redirect path.
    pub fn sanity_check(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            anyhow::bail!("client_id must not be empty");
        }
        if self.tenant_id.trim().is_empty() {
            anyhow::bail!("tenant_id must not be empty");
        }
        if self.client_credential.trim().is_empty() {
            anyhow::bail!("client_credential must not be empty");
        }
        let authority = self.authority();
        let parsed = Url::parse(&authority)
            .with_context(|| format!("authority '{}' is not a valid URL", authority))?;
        if parsed.scheme() != "https" {
            anyhow::bail!("authority '{}' must use https", authority);
        }
        if !self.redirect_path.starts_with('/') {
            anyhow::bail!(
                "redirect_path '{}' must be host-relative (start with '/')",
                self.redirect_path
            );
        }
        Ok(())
    }
}
