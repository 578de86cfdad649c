//! Dev-environment entrypoint.
//!
//! ```text
//! export AAD_CONFIG_PATH=aad.config.json
//! export KEYVAULT_ENDPOINT=https://<your-vault>.vault.azure.net
//! export SECRET_NAME=a-secret
//! cargo run
//! ```
//!
//! The development listener serves HTTPS on 127.0.0.1 with a freshly
//! generated self-signed certificate. Do not run production with this
//! configuration; set ENVIRONMENT=production behind a TLS-terminating
//! reverse proxy instead.

use anyhow::Result;
use entra_webapp::{
    config::{Config, Environment, SessionBackend},
    identity::{client::IdentityClient, settings::AadSettings},
    web, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting identity sample webapp");

    // Load configuration from environment
    let config = Config::load()?;
    tracing::info!(
        environment = ?config.environment,
        graph_endpoint = %config.graph_endpoint,
        keyvault_endpoint = %config.keyvault_endpoint,
        "Configuration loaded"
    );

    // Parse the identity-provider settings file
    let mut settings = AadSettings::from_file(&config.aad_config_path)?;
    if config.is_production() {
        // Use the client credential from outside the config file, if available
        if let Some(secure_client_credential) = &config.secure_client_credential {
            settings.apply_secure_credential(secure_client_credential);
        }
    }
    settings.sanity_check()?;
    tracing::info!(
        authority = %settings.authority(),
        client_id = %settings.client_id,
        "Identity settings loaded"
    );

    let settings = Arc::new(settings);
    let identity = Arc::new(IdentityClient::new(
        settings.clone(),
        config.http_connect_timeout_secs,
        config.http_request_timeout_secs,
    )?);

    // Shared outbound client for the vault and graph calls
    let http = reqwest::ClientBuilder::new()
        .connect_timeout(Duration::from_secs(config.http_connect_timeout_secs))
        .timeout(Duration::from_secs(config.http_request_timeout_secs))
        .build()?;

    // Server-side session store (large token payloads do not fit in cookies)
    let store = match config.session_backend {
        SessionBackend::Memory => MemoryStore::default(),
    };
    let session_layer = SessionManagerLayer::new(store)
        .with_secure(config.is_production())
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(30)));

    let config_arc = Arc::new(config.clone());
    let state = Arc::new(AppState {
        config: config_arc,
        settings,
        identity,
        http,
    });

    let app = web::create_router(state, session_layer);

    let bind_address = config.bind_address();
    match config.environment {
        Environment::Production => {
            // TLS terminates at the reverse proxy; forwarded headers are
            // trusted when building redirect URLs
            let listener = tokio::net::TcpListener::bind(&bind_address).await?;
            tracing::info!("Listening on http://{} (behind reverse proxy)", bind_address);
            axum::serve(listener, app).await?;
        }
        Environment::Development => {
            // Locally generated, untrusted certificate. Development only -
            // do not run production with this listener.
            let cert = rcgen::generate_simple_self_signed(vec![
                config.server_host.clone(),
                "localhost".to_string(),
            ])?;
            let tls = axum_server::tls_rustls::RustlsConfig::from_pem(
                cert.cert.pem().into_bytes(),
                cert.key_pair.serialize_pem().into_bytes(),
            )
            .await?;

            let addr: SocketAddr = bind_address.parse()?;
            tracing::warn!(
                "Listening on https://{} with a self-signed certificate (development only)",
                bind_address
            );
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await?;
        }
    }

    Ok(())
}
