use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// --- Module Structure ---

// Core client services and components.
pub mod api;
pub mod assets;
pub mod config;
pub mod errors;
pub mod models;
pub mod navigation;
pub mod session;
pub mod upload;

// --- Public Re-exports ---

// Makes the core types easily accessible to host applications.
pub use api::ApiClient;
pub use config::{AppConfig, Env};
pub use errors::{AdminError, Result};
pub use models::{Authority, Permission, Role, Session};
pub use session::{
    FileSessionStore, GuardState, MemorySessionStore, RoleRequirement, RouteGuard, SessionGuard,
    SessionState, SessionStore,
};
pub use upload::{HttpUploadTransport, MockUploadTransport, UploadPipeline};

/// AdminConsole
///
/// Implements the **Unified State Pattern**: a single, thread-safe container
/// holding every service a host application needs to drive the console —
/// configuration, the shared session store, the typed API client, and the
/// upload pipeline. All components read the same session store, so login,
/// logout, guards, and the 401 interceptor stay consistent with each other.
#[derive(Clone)]
pub struct AdminConsole {
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
    /// The persisted session (token + user record), shared by every component.
    pub session: SessionState,
    /// Typed REST client for every backend endpoint the console consumes.
    pub api: ApiClient,
    /// Direct-to-storage asset upload pipeline.
    pub uploads: Arc<UploadPipeline>,
}

impl AdminConsole {
    /// new
    ///
    /// Assembles the console with the file-backed session store at the
    /// configured path, so a login survives process restarts.
    pub fn new(config: AppConfig) -> Self {
        let store: SessionState = Arc::new(FileSessionStore::open(config.session_path.clone()));
        Self::with_store(config, store)
    }

    /// with_store
    ///
    /// Assembles the console around a caller-supplied session store. Used by
    /// tests (in-memory store) and by hosts with their own persistence.
    pub fn with_store(config: AppConfig, session: SessionState) -> Self {
        let api = ApiClient::new(&config, session.clone());
        let transport = Arc::new(HttpUploadTransport::new(&config.api_base_url));
        let uploads = Arc::new(UploadPipeline::new(transport, session.clone()));

        Self {
            config,
            session,
            api,
            uploads,
        }
    }

    /// Resolves an uploaded object's storage key into a displayable URL.
    pub fn asset_url(&self, key: &str) -> String {
        assets::asset_url(&self.config.asset_base_url, key)
    }
}

/// init_tracing
///
/// Initializes the logging stack for a host application. The default log level
/// prioritizes the RUST_LOG environment variable, falling back to a sensible
/// default for local development. The output format is selected by the runtime
/// environment: pretty print for human readability locally, JSON for ingestion
/// by centralized log aggregators in production.
pub fn init_tracing(env: &Env) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "admin_console=debug".into());

    match env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }
}
