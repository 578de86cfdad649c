//! Sample identity-gated web application
//!
//! Wires an OAuth2/OIDC sign-in flow, a session-backed router, and two
//! downstream cloud calls (a Key Vault secret fetch and a Microsoft Graph
//! request) behind a single authentication gate.

#![deny(dead_code)]

pub mod config;
pub mod graph;
pub mod identity;
pub mod keyvault;
pub mod web;

use config::Config;
use identity::client::IdentityClient;
use identity::settings::AadSettings;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub settings: Arc<AadSettings>,
    pub identity: Arc<IdentityClient>,
    /// Shared outbound HTTP client for the vault and graph calls
    pub http: reqwest::Client,
}
