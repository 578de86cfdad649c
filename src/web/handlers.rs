use super::templates::{
    ClaimRow, GraphTemplate, SecretsTemplate, StatusTemplate, TokenTemplate,
};
use crate::identity::context::{IdentityContext, IDENTITY_SESSION_KEY};
use crate::identity::extractors::AuthenticatedUser;
use crate::keyvault::{ChainedTokenCredential, ClientSecretCredential, SecretClient};
use crate::{graph, AppState};
use askama::Template;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::sync::Arc;
use tower_sessions::Session;

/// Wrapper turning any downstream failure into a generic 500.
///
/// Failures from the identity provider, the vault, or the graph call are
/// not handled locally; they bubble up through `?` and surface here.
pub struct AppError(anyhow::Error);

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.0, "Unhandled downstream error");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

/// Status page - anonymous, shows sign-in state
pub async fn index_handler(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> impl IntoResponse {
    // Best-effort read; the status page renders either way
    let identity: Option<IdentityContext> =
        session.get(IDENTITY_SESSION_KEY).await.unwrap_or(None);

    let template = StatusTemplate {
        description: state.config.sample_description.clone(),
        username: identity
            .filter(|i| i.authenticated)
            .and_then(|i| i.username),
    };
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response(),
    }
}

/// Token details page - gated, renders the id-token claims from the session
pub async fn token_details_handler(
    AuthenticatedUser { context }: AuthenticatedUser,
) -> Result<Response, AppError> {
    tracing::info!("token_details: user is authenticated, will display token details");

    let claims = context
        .id_token_claims
        .iter()
        .map(|(name, value)| ClaimRow {
            name: name.clone(),
            value: match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            },
        })
        .collect();

    let template = TokenTemplate {
        username: context.username,
        claims,
    };
    Ok(Html(template.render()?).into_response())
}

/// Secret page - gated, fetches one named secret from the vault.
///
/// Authenticates to the vault with the app's own registered credential
/// (via a credential chain), not the signed-in user's token.
pub async fn get_secrets_handler(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser { .. }: AuthenticatedUser,
) -> Result<Response, AppError> {
    let credential_from_settings = ClientSecretCredential::new(
        state.settings.tenant_id.clone(),
        state.settings.client_id.clone(),
        state.settings.client_credential.clone(),
        state.http.clone(),
    )
    .with_authority(&state.settings.authority());
    let credential = ChainedTokenCredential::new(vec![Arc::new(credential_from_settings)]);

    let client = SecretClient::new(
        &state.config.keyvault_endpoint,
        Arc::new(credential),
        state.http.clone(),
    );
    let secret = client.get_secret(&state.config.secret_name).await?;

    let template = SecretsTemplate {
        secret_name: state.config.secret_name.clone(),
        secret_value: secret.value,
        secret_id: secret.id,
    };
    Ok(Html(template.render()?).into_response())
}

/// Graph page - gated; silently refreshes the access token, then calls the
/// configured graph endpoint with it. Refresh always precedes the call.
pub async fn call_ms_graph_handler(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser { context }: AuthenticatedUser,
    session: Session,
) -> Result<Response, AppError> {
    let refresh_token = context
        .refresh_token
        .clone()
        .ok_or_else(|| anyhow::anyhow!("No refresh token cached for this session"))?;

    // Refresh-then-call: the graph request always uses a fresh token
    let tokens = state.identity.acquire_token_silently(&refresh_token).await?;

    let mut updated = context;
    updated.access_token = Some(tokens.access_token.clone());
    if tokens.refresh_token.is_some() {
        updated.refresh_token = tokens.refresh_token;
    }
    session.insert(IDENTITY_SESSION_KEY, updated).await?;

    let results = graph::get_json(
        &state.http,
        &state.config.graph_endpoint,
        &tokens.access_token,
    )
    .await?;

    let template = GraphTemplate {
        endpoint: state.config.graph_endpoint.clone(),
        results: serde_json::to_string_pretty(&results)?,
    };
    Ok(Html(template.render()?).into_response())
}
