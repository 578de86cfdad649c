//! End-to-end tests for the route gate: anonymous endpoints always render,
//! gated endpoints reject anonymous callers with the 401 page before any
//! handler body runs, and delegate to the handler once a session identity
//! exists. Downstream happy paths run against a local mock provider.

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use entra_webapp::{
    config::{Config, Environment, SessionBackend},
    identity::{
        client::IdentityClient,
        context::{IdentityContext, IDENTITY_SESSION_KEY},
        settings::AadSettings,
    },
    web, AppState,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

const SAMPLE_DESCRIPTION: &str = "Authorization sample under test";
const FRESH_ACCESS_TOKEN: &str = "fresh-access-token";

// =============================================================================
// Mock identity provider, vault, and graph endpoints
// =============================================================================

async fn mock_token_endpoint() -> Json<serde_json::Value> {
    // Serves both the client-credentials and the refresh-token grants
    Json(json!({
        "access_token": FRESH_ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": "next-refresh-token"
    }))
}

async fn mock_secret_endpoint() -> Json<serde_json::Value> {
    Json(json!({
        "value": "vault-secret-value",
        "id": "https://mock-vault/secrets/a-secret/1"
    }))
}

async fn mock_graph_endpoint(headers: HeaderMap) -> Result<Json<serde_json::Value>, StatusCode> {
    // Only the refreshed token is accepted; a stale one means the app
    // skipped the silent refresh
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if authorization != format!("Bearer {}", FRESH_ACCESS_TOKEN) {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(Json(json!({
        "displayName": "Ada Lovelace",
        "userPrincipalName": "ada@example.com"
    })))
}

/// Spawn a local server standing in for the authority, the vault, and graph.
/// Returns its base URL.
async fn spawn_mock_provider() -> String {
    let app = Router::new()
        .route(
            "/tenant-under-test/oauth2/v2.0/token",
            post(mock_token_endpoint),
        )
        .route("/secrets/{name}", get(mock_secret_endpoint))
        .route("/graph/users", get(mock_graph_endpoint));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

// =============================================================================
// App under test
// =============================================================================

/// Base URL pointing at a closed port: downstream calls must fail fast
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn test_state(provider_base: &str) -> Arc<AppState> {
    let config = Arc::new(Config {
        environment: Environment::Development,
        server_host: "127.0.0.1".to_string(),
        server_port: 5000,
        session_backend: SessionBackend::Memory,
        sample_description: SAMPLE_DESCRIPTION.to_string(),
        graph_endpoint: format!("{}/graph/users", provider_base),
        keyvault_endpoint: provider_base.to_string(),
        secret_name: "a-secret".to_string(),
        aad_config_path: "aad.config.json".to_string(),
        secure_client_credential: None,
        http_connect_timeout_secs: 1,
        http_request_timeout_secs: 2,
    });

    let settings = Arc::new(AadSettings {
        authority: Some(format!("{}/tenant-under-test", provider_base)),
        ..AadSettings::from_json(
            r#"{
                "client_id": "client-under-test",
                "tenant_id": "tenant-under-test",
                "client_credential": "test-secret",
                "scopes": ["User.Read"]
            }"#,
        )
        .unwrap()
    });

    let identity = Arc::new(IdentityClient::new(settings.clone(), 1, 2).unwrap());
    let http = reqwest::ClientBuilder::new()
        .connect_timeout(std::time::Duration::from_secs(1))
        .timeout(std::time::Duration::from_secs(2))
        .build()
        .unwrap();

    Arc::new(AppState {
        config,
        settings,
        identity,
        http,
    })
}

fn sample_context(refresh_token: Option<&str>) -> IdentityContext {
    let mut claims = serde_json::Map::new();
    claims.insert("preferred_username".into(), "ada@example.com".into());
    claims.insert("oid".into(), "00000000-aaaa-bbbb-cccc-dddddddddddd".into());
    IdentityContext::from_token_exchange(
        claims,
        "stale-access-token".to_string(),
        refresh_token.map(|s| s.to_string()),
    )
}

async fn test_sign_in(session: Session) -> StatusCode {
    session
        .insert(IDENTITY_SESSION_KEY, sample_context(Some("refresh-token")))
        .await
        .unwrap();
    StatusCode::OK
}

async fn test_sign_in_no_refresh(session: Session) -> StatusCode {
    session
        .insert(IDENTITY_SESSION_KEY, sample_context(None))
        .await
        .unwrap();
    StatusCode::OK
}

/// App router plus test-only sign-in routes sharing the same session store
fn test_app(state: Arc<AppState>) -> Router {
    let store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(store).with_secure(false);

    let test_routes = Router::new()
        .route("/test/sign_in", get(test_sign_in))
        .route("/test/sign_in_no_refresh", get(test_sign_in_no_refresh))
        .layer(session_layer.clone());

    web::create_router(state, session_layer).merge(test_routes)
}

async fn get_response(app: &Router, path: &str, cookie: Option<&str>) -> (StatusCode, String) {
    let mut request = Request::builder().uri(path);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&body).to_string())
}

/// Establish a session via a test route, return the session cookie pair
async fn sign_in_via(app: &Router, path: &str) -> String {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie should be set")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

// =============================================================================
// Anonymous endpoints
// =============================================================================

#[tokio::test]
async fn index_renders_for_anonymous_callers() {
    let app = test_app(test_state(UNREACHABLE));

    for path in ["/", "/sign_in_status"] {
        let (status, body) = get_response(&app, path, None).await;
        assert_eq!(status, StatusCode::OK, "{} should render", path);
        assert!(body.contains(SAMPLE_DESCRIPTION));
        assert!(body.contains("not signed in"));
    }
}

#[tokio::test]
async fn index_shows_username_when_signed_in() {
    let app = test_app(test_state(UNREACHABLE));
    let cookie = sign_in_via(&app, "/test/sign_in").await;

    let (status, body) = get_response(&app, "/", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ada@example.com"));
}

// =============================================================================
// The gate
// =============================================================================

#[tokio::test]
async fn gated_endpoints_reject_anonymous_callers_with_401_page() {
    let app = test_app(test_state(UNREACHABLE));

    for path in ["/token_details", "/get_secrets", "/call_ms_graph"] {
        let (status, body) = get_response(&app, path, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} should be gated", path);
        // The 401 template, not a stack trace or generic error
        assert!(body.contains("Sign in required"), "{} body: {}", path, body);
    }
}

#[tokio::test]
async fn token_details_renders_claims_when_authenticated() {
    let app = test_app(test_state(UNREACHABLE));
    let cookie = sign_in_via(&app, "/test/sign_in").await;

    let (status, body) = get_response(&app, "/token_details", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("preferred_username"));
    assert!(body.contains("ada@example.com"));
    assert!(body.contains("00000000-aaaa-bbbb-cccc-dddddddddddd"));
}

#[tokio::test]
async fn get_secrets_delegates_and_downstream_failure_is_generic() {
    let app = test_app(test_state(UNREACHABLE));
    let cookie = sign_in_via(&app, "/test/sign_in").await;

    // The gate delegates: the handler body runs, its unreachable downstream
    // surfaces as the generic 500, never the 401 page
    let (status, body) = get_response(&app, "/get_secrets", Some(&cookie)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains("Sign in required"));
}

#[tokio::test]
async fn call_ms_graph_fails_when_no_refresh_token_is_cached() {
    let app = test_app(test_state(UNREACHABLE));
    let cookie = sign_in_via(&app, "/test/sign_in_no_refresh").await;

    // Refresh-then-call: with no cached refresh token the silent refresh
    // fails first and propagates
    let (status, body) = get_response(&app, "/call_ms_graph", Some(&cookie)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains("Sign in required"));
}

// =============================================================================
// Downstream happy paths (mock provider)
// =============================================================================

#[tokio::test]
async fn get_secrets_renders_the_secret_value() {
    let provider = spawn_mock_provider().await;
    let app = test_app(test_state(&provider));
    let cookie = sign_in_via(&app, "/test/sign_in").await;

    let (status, body) = get_response(&app, "/get_secrets", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert!(body.contains("a-secret"));
    assert!(body.contains("vault-secret-value"));
}

#[tokio::test]
async fn call_ms_graph_refreshes_then_renders_graph_fields() {
    let provider = spawn_mock_provider().await;
    let app = test_app(test_state(&provider));
    let cookie = sign_in_via(&app, "/test/sign_in").await;

    // The mock graph endpoint rejects anything but the refreshed token, so
    // a 200 here proves the refresh-then-call ordering
    let (status, body) = get_response(&app, "/call_ms_graph", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert!(body.contains("displayName"));
    assert!(body.contains("Ada Lovelace"));
}

// =============================================================================
// Sign-in flow endpoints
// =============================================================================

#[tokio::test]
async fn sign_in_redirects_to_the_authorize_endpoint() {
    let app = test_app(test_state(UNREACHABLE));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/sign_in")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location
        .starts_with("http://127.0.0.1:9/tenant-under-test/oauth2/v2.0/authorize"));
    assert!(location.contains("client_id=client-under-test"));
    assert!(location.contains("state="));
}

#[tokio::test]
async fn redirect_rejects_state_mismatch() {
    let app = test_app(test_state(UNREACHABLE));

    // Start a sign-in so a CSRF state is stored in the session
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/sign_in")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie should be set")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let (status, _body) = get_response(
        &app,
        "/auth/redirect?code=abc&state=wrong-state",
        Some(&cookie),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn redirect_requires_a_state_parameter() {
    let app = test_app(test_state(UNREACHABLE));

    let (status, _body) = get_response(&app, "/auth/redirect?code=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
