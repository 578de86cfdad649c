//! Session-identity record
//!
//! One opaque record per browser session, stored by the session layer under
//! a fixed key. The route gate only reads it; the sign-in callback is the
//! only writer (plus the silent refresh, which updates the token fields).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Session key for the identity record
pub const IDENTITY_SESSION_KEY: &str = "identity";

/// Session key for the in-flight sign-in CSRF state
pub const AUTH_STATE_SESSION_KEY: &str = "auth_state";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityContext {
    pub authenticated: bool,
    /// Display name taken from the id-token claims
    pub username: Option<String>,
    /// Decoded id-token claims for the token details page
    pub id_token_claims: Map<String, Value>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl IdentityContext {
    /// Build an authenticated context from a completed token exchange
    pub fn from_token_exchange(
        id_token_claims: Map<String, Value>,
        access_token: String,
        refresh_token: Option<String>,
    ) -> Self {
        let username = id_token_claims
            .get("preferred_username")
            .or_else(|| id_token_claims.get("name"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Self {
            authenticated: true,
            username,
            id_token_claims,
            access_token: Some(access_token),
            refresh_token,
        }
    }
}
