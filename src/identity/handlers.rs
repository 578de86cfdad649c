//! Sign-in, callback, and sign-out handlers
//!
//! These register the identity-provider flow endpoints:
//! - `sign_in_handler`: redirects to the authority's authorize endpoint
//! - `redirect_handler`: handles the callback, exchanges the code, and
//!   writes the session-identity record
//! - `sign_out_handler`: clears the session and redirects to end-session

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use crate::identity::claims::decode_claims;
use crate::identity::context::{
    IdentityContext, AUTH_STATE_SESSION_KEY, IDENTITY_SESSION_KEY,
};
use crate::AppState;

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// =============================================================================
// URL helpers
// =============================================================================

/// Resolve the externally visible base URL for this request.
///
/// In production the process sits behind a reverse proxy and trusts the
/// forwarded headers. In development the local TLS listener is the edge, so
/// the Host header (or the bind address) is used directly.
pub fn external_base_url(state: &AppState, headers: &HeaderMap) -> String {
    if state.config.is_production() {
        if let Some(host) = header_str(headers, "x-forwarded-host") {
            let proto =
                header_str(headers, "x-forwarded-proto").unwrap_or_else(|| "https".to_string());
            return format!("{}://{}", proto, host);
        }
    }

    // Both modes answer on HTTPS: the development listener terminates TLS
    // itself, production terminates at the proxy.
    let host = header_str(headers, "host").unwrap_or_else(|| state.config.bind_address());
    format!("https://{}", host)
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Build the authority end-session URL with a post-sign-out redirect
pub fn build_sign_out_url(end_session_endpoint: &str, post_sign_out_url: &str) -> String {
    format!(
        "{}?post_logout_redirect_uri={}",
        end_session_endpoint,
        urlencoding::encode(post_sign_out_url)
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Sign-in handler - redirects to the identity provider's authorize endpoint
pub async fn sign_in_handler(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Response {
    tracing::info!("Sign-in requested");

    let redirect_uri = format!(
        "{}{}",
        external_base_url(&state, &headers),
        state.settings.redirect_path
    );

    let (auth_url, csrf_token) = match state.identity.authorize_redirect(&redirect_uri) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build authorization URL");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Identity provider configuration error"})),
            )
                .into_response();
        }
    };

    // Store CSRF state in the session for callback validation
    if let Err(e) = session
        .insert(AUTH_STATE_SESSION_KEY, csrf_token.secret().clone())
        .await
    {
        tracing::error!(error = %e, "Failed to store sign-in state in session");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Internal server error"})),
        )
            .into_response();
    }

    tracing::info!(
        authority = %state.settings.authority(),
        redirect_uri = %redirect_uri,
        "Redirecting to identity provider for authentication"
    );

    Redirect::to(auth_url.as_str()).into_response()
}

/// Callback handler - validates state, exchanges the code, writes the session
pub async fn redirect_handler(
    Query(params): Query<CallbackParams>,
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Response {
    tracing::info!("Identity provider callback received");

    // Check for provider errors
    if let Some(error) = params.error {
        tracing::warn!(
            error = %error,
            description = ?params.error_description,
            "Authorization failed at the identity provider"
        );
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": error,
                "error_description": params.error_description
            })),
        )
            .into_response();
    }

    // CSRF protection: the state parameter must match the stored session value
    let Some(state_from_callback) = params.state.as_deref() else {
        tracing::warn!("CSRF validation failed: no state parameter in callback");
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Missing state parameter"})),
        )
            .into_response();
    };

    let stored_state: Option<String> = match session.remove(AUTH_STATE_SESSION_KEY).await {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read sign-in state from session");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    };

    let Some(stored_state) = stored_state else {
        tracing::warn!("CSRF validation failed: no stored sign-in state");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "CSRF validation failed: missing state"})),
        )
            .into_response();
    };

    if state_from_callback != stored_state {
        tracing::warn!("CSRF validation failed: state mismatch");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "CSRF validation failed: state mismatch"})),
        )
            .into_response();
    }

    let Some(code) = params.code else {
        tracing::warn!("No authorization code received");
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Missing authorization code"})),
        )
            .into_response();
    };

    tracing::debug!(code_length = code.len(), "Authorization code received");

    let redirect_uri = format!(
        "{}{}",
        external_base_url(&state, &headers),
        state.settings.redirect_path
    );

    let tokens = match state.identity.exchange_code(code, &redirect_uri).await {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::error!(error = %e, "Failed to exchange code for tokens");
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Token exchange failed"})),
            )
                .into_response();
        }
    };

    let id_token_claims = tokens
        .id_token
        .as_deref()
        .and_then(decode_claims)
        .unwrap_or_default();
    if id_token_claims.is_empty() {
        tracing::warn!("No id token claims available - token details page will be empty");
    }

    let context = IdentityContext::from_token_exchange(
        id_token_claims,
        tokens.access_token,
        tokens.refresh_token,
    );

    // New session id on privilege change, then persist the identity record
    if let Err(e) = session.cycle_id().await {
        tracing::error!(error = %e, "Failed to cycle session id");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Internal server error"})),
        )
            .into_response();
    }
    if let Err(e) = session.insert(IDENTITY_SESSION_KEY, context).await {
        tracing::error!(error = %e, "Failed to store identity in session");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Internal server error"})),
        )
            .into_response();
    }

    tracing::info!("Authentication successful, redirecting to status page");
    Redirect::to("/").into_response()
}

/// Sign-out handler - flushes the session, then redirects to end-session
pub async fn sign_out_handler(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Response {
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to clear session on sign-out");
    } else {
        tracing::info!("Session cleared on sign-out");
    }

    let post_sign_out_url = format!("{}/sign_in_status", external_base_url(&state, &headers));
    let sign_out_url =
        build_sign_out_url(&state.settings.end_session_endpoint(), &post_sign_out_url);

    tracing::info!(
        authority = %state.settings.authority(),
        "Redirecting to identity provider end-session"
    );
    Redirect::to(&sign_out_url).into_response()
}
