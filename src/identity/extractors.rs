use crate::identity::context::{IdentityContext, IDENTITY_SESSION_KEY};
use crate::web::templates::UnauthenticatedTemplate;
use askama::Template;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tower_sessions::Session;

/// Authentication error for gated endpoints
#[derive(Debug)]
pub enum AuthError {
    /// Caller has no valid session-identity reference
    NotAuthenticated,
    /// Session layer failure
    Internal(String),
}

impl AuthError {
    /// Status code rendered for not-authenticated callers
    pub const NOT_AUTHENTICATED_STATUS: StatusCode = StatusCode::UNAUTHORIZED;
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::NotAuthenticated => {
                let template = UnauthenticatedTemplate {};
                match template.render() {
                    Ok(html) => {
                        (Self::NOT_AUTHENTICATED_STATUS, Html(html)).into_response()
                    }
                    Err(_) => (
                        Self::NOT_AUTHENTICATED_STATUS,
                        "Authentication required. Please sign in.",
                    )
                        .into_response(),
                }
            }
            AuthError::Internal(msg) => {
                tracing::error!(error = %msg, "Session layer failure during authentication");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// Authenticated user extractor - the route gate
///
/// Runs before any handler body. Loads the session-identity record and
/// rejects with `AuthError::NotAuthenticated` when it is missing, so gated
/// handlers never execute (and make no downstream calls) for anonymous
/// callers.
///
/// Usage:
/// ```rust,ignore
/// async fn handler(AuthenticatedUser { context }: AuthenticatedUser) {
///     // User is authenticated, token data is in `context`
/// }
/// ```
pub struct AuthenticatedUser {
    pub context: IdentityContext,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. The session layer owns all session persistence; we only read it
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AuthError::Internal(msg.to_string()))?;

        // 2. Load the identity record written by the sign-in callback
        let context: Option<IdentityContext> = session
            .get(IDENTITY_SESSION_KEY)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        match context {
            Some(context) if context.authenticated => {
                tracing::debug!(username = ?context.username, "Request authenticated via session");
                Ok(AuthenticatedUser { context })
            }
            _ => Err(AuthError::NotAuthenticated),
        }
    }
}
