use std::env;
use std::path::PathBuf;

/// AppConfig
///
/// Holds the client's entire configuration state. This struct is designed to be
/// immutable once loaded, ensuring consistency across every component that reads
/// it (ApiClient, UploadPipeline, asset URL formatting).
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Base URL of the platform REST backend (no trailing slash).
    pub api_base_url: String,
    /// Public host serving uploaded assets; storage keys are resolved against it.
    pub asset_base_url: String,
    /// Path of the file-backed session store (token + user record).
    pub session_path: PathBuf,
    /// Runtime environment marker. Controls logging format selection.
    pub env: Env,
}

/// Env
///
/// Defines the runtime context, used to switch between development conveniences
/// (pretty logs, localhost defaults) and production-grade behavior (JSON logs,
/// mandatory configuration).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for test
    /// setup. This allows instantiating the configuration without touching
    /// environment variables.
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:4000/api".to_string(),
            asset_base_url: "http://localhost:9000/platform-assets".to_string(),
            session_path: env::temp_dir().join("admin-console-session.json"),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the client configuration at startup.
    /// It reads all parameters from environment variables (after loading `.env`)
    /// and implements the **fail-fast** principle.
    ///
    /// # Panics
    /// Panics if a critical environment variable required for the current runtime
    /// environment (especially Production) is not found. This prevents the console
    /// from starting pointed at an incomplete or insecure configuration.
    pub fn load() -> Self {
        // Loads .env file settings before configuration can be read.
        dotenv::dotenv().ok();

        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let session_path = env::var("ADMIN_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("admin-console-session.json"));

        match env {
            Env::Local => Self {
                env: Env::Local,
                // Local development talks to a backend on localhost by default.
                api_base_url: env::var("ADMIN_API_URL")
                    .unwrap_or_else(|_| "http://localhost:4000/api".to_string()),
                asset_base_url: env::var("ASSET_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:9000/platform-assets".to_string()),
                session_path,
            },
            Env::Production => Self {
                env: Env::Production,
                // Production demands explicit setting of both external hosts.
                api_base_url: env::var("ADMIN_API_URL")
                    .expect("FATAL: ADMIN_API_URL required in production"),
                asset_base_url: env::var("ASSET_BASE_URL")
                    .expect("FATAL: ASSET_BASE_URL required in production"),
                session_path,
            },
        }
    }
}
