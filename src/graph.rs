//! Microsoft Graph call
//!
//! One outbound GET with the signed-in user's bearer token. The endpoint is
//! fixed at startup by configuration; callers pass the freshly refreshed
//! access token.

use anyhow::{Context, Result};

/// GET the configured graph endpoint with a bearer token, parse the JSON body
pub async fn get_json(
    http: &reqwest::Client,
    endpoint: &str,
    access_token: &str,
) -> Result<serde_json::Value> {
    tracing::info!(endpoint = %endpoint, "Calling graph API");

    let response = http
        .get(endpoint)
        .bearer_auth(access_token)
        .send()
        .await
        .context("Graph request failed")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Graph API returned {}: {}", status, body);
    }

    response
        .json()
        .await
        .context("Failed to parse graph response")
}
