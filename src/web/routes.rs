use super::handlers::{
    call_ms_graph_handler, get_secrets_handler, index_handler, token_details_handler,
};
use crate::{
    identity::{redirect_handler, sign_in_handler, sign_out_handler},
    AppState,
};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_sessions::{MemoryStore, SessionManagerLayer};

/// Build the endpoint table. Registered once at startup, immutable after.
pub fn create_router(
    state: Arc<AppState>,
    session_layer: SessionManagerLayer<MemoryStore>,
) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/sign_in_status", get(index_handler))
        .route("/token_details", get(token_details_handler))
        .route("/get_secrets", get(get_secrets_handler))
        .route("/call_ms_graph", get(call_ms_graph_handler))
        .route("/auth/sign_in", get(sign_in_handler))
        .route("/auth/redirect", get(redirect_handler))
        .route("/auth/sign_out", get(sign_out_handler))
        .nest_service("/static", ServeDir::new("static"))
        .layer(session_layer)
        .with_state(state)
}
