use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use specreg_db::{InMemoryDatabase, MetadataStore, WalDatabase};
use specreg_quota::{EnvLimit, QuotaPolicy};
use specreg_registry::{Registry, RegistryError};
use specreg_spec::JsonSpecProcessor;
use specreg_store::{BlobStore, FsBlobStore, InMemoryBlobStore};

use crate::auth::{AuthProvider, CredentialAuth, TrustedHeaderAuth};
use crate::config::{AuthMode, ServerConfig};
use crate::error::{ServerError, ServerResult};
use crate::router::{build_router, AppState};

const BLOB_DIR: &str = "blobs";
const JOURNAL_FILE: &str = "metadata.wal";

/// Spec registry server.
pub struct SpecregServer {
    config: ServerConfig,
    state: AppState,
}

impl SpecregServer {
    /// Open the stores named by `config` and wire up the registry.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let registry = Arc::new(build_registry(&config)?);
        let auth: Arc<dyn AuthProvider> = match config.auth {
            AuthMode::Credentials => Arc::new(CredentialAuth::new(registry.clone())),
            AuthMode::TrustedHeader => Arc::new(TrustedHeaderAuth::new(&config.trusted_header)?),
        };
        Ok(Self {
            config,
            state: AppState::new(registry, auth),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.state.registry
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.config.max_body_bytes)
    }

    /// Serve until ctrl-c.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(
            addr = %self.config.bind_addr,
            auth = ?self.config.auth,
            persistent = self.config.data_dir.is_some(),
            "specreg server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        info!("specreg server stopped");
        Ok(())
    }
}

/// Persistent stores under `data_dir` when set, in-memory otherwise.
fn build_registry(config: &ServerConfig) -> ServerResult<Registry> {
    let (blobs, metadata): (Arc<dyn BlobStore>, Arc<dyn MetadataStore>) = match &config.data_dir {
        Some(dir) => {
            let blobs = FsBlobStore::open(dir.join(BLOB_DIR)).map_err(RegistryError::from)?;
            let metadata =
                WalDatabase::open(&dir.join(JOURNAL_FILE), config.wal_sync).map_err(RegistryError::from)?;
            info!(data_dir = %dir.display(), "opened persistent stores");
            (Arc::new(blobs), Arc::new(metadata))
        }
        None => {
            warn!("no data_dir configured; specs and credentials are kept in memory only");
            (Arc::new(InMemoryBlobStore::new()), Arc::new(InMemoryDatabase::new()))
        }
    };
    Ok(Registry::new(
        Arc::new(JsonSpecProcessor::new()),
        blobs,
        metadata,
        QuotaPolicy::new(EnvLimit::free_tier(config.free_tier_model_count)),
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

impl std::fmt::Debug for SpecregServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecregServer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
