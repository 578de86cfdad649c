use std::env;

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

/// Session store backend selection.
///
/// Only the in-memory store is wired; the value is still validated so that a
/// typo fails at startup instead of silently running with the default.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionBackend {
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    // Environment configuration
    pub environment: Environment,

    // Server configuration
    pub server_host: String,
    pub server_port: u16,

    // Session store selection
    pub session_backend: SessionBackend,

    // Navbar description shown on the status page
    pub sample_description: String,

    // Microsoft Graph API endpoint
    pub graph_endpoint: String,

    // Key Vault endpoint and secret to fetch
    pub keyvault_endpoint: String,
    pub secret_name: String,

    // Path to the identity-provider client settings JSON file
    pub aad_config_path: String,

    // Production-only override for the client credential in the JSON file
    pub secure_client_credential: Option<String>,

    // HTTP client timeout configuration (in seconds)
    pub http_connect_timeout_secs: u64,
    pub http_request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables using std::env::var
    pub fn load() -> anyhow::Result<Self> {
        // Parse environment type
        let environment = match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        let session_backend = match env::var("SESSION_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => SessionBackend::Memory,
            other => {
                return Err(anyhow::anyhow!(
                    "Unsupported SESSION_BACKEND '{}' (supported: memory)",
                    other
                ))
            }
        };

        // Optional variables with defaults matching the sample configuration
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(5000);

        let sample_description = env::var("SAMPLE_DESCRIPTION")
            .unwrap_or_else(|_| "Authorization: sign in and call downstream APIs".to_string());

        let graph_endpoint = env::var("GRAPH_ENDPOINT")
            .unwrap_or_else(|_| "https://graph.microsoft.com/v1.0/users".to_string());

        let keyvault_endpoint = env::var("KEYVAULT_ENDPOINT")
            .unwrap_or_else(|_| "https://keyvault-pythonqs-kv.vault.azure.net".to_string());

        let secret_name = env::var("SECRET_NAME").unwrap_or_else(|_| "a-secret".to_string());

        let aad_config_path =
            env::var("AAD_CONFIG_PATH").unwrap_or_else(|_| "aad.config.json".to_string());

        // Credential supplied by the deployment platform; only honored in
        // production (see AadSettings::apply_secure_credential).
        let secure_client_credential = env::var("SECURE_CLIENT_CREDENTIAL")
            .ok()
            .filter(|s| !s.is_empty());

        let http_connect_timeout_secs = env::var("HTTP_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);

        let http_request_timeout_secs = env::var("HTTP_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        Ok(Config {
            environment,
            server_host,
            server_port,
            session_backend,
            sample_description,
            graph_endpoint,
            keyvault_endpoint,
            secret_name,
            aad_config_path,
            secure_client_credential,
            http_connect_timeout_secs,
            http_request_timeout_secs,
        })
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get bind address for server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
