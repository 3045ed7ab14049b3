//! Scenario server binary for Portcon.
//!
//! Wires the configured persistence backend, the version watcher, and the
//! scenario store into the REST API and serves it until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `portcon-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Open the persistence backend (`PostgreSQL` pool + migrations, or memory)
//! 4. Create the version watcher and scenario store
//! 5. Serve the REST API until shutdown
//! 6. Close the connection pool

mod error;

use std::path::Path;
use std::sync::Arc;

use portcon_api::AppState;
use portcon_core::config::{DatabaseBackend, DatabaseConfig, LogFormat, LoggingConfig};
use portcon_core::{PortconConfig, ScenarioStore, VersionWatcher};
use portcon_db::{MemoryScenarioRepository, PostgresConfig, PostgresPool, ScenarioRepository};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::StartupError;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "portcon-config.yaml";

/// Application entry point for the scenario server.
///
/// # Errors
///
/// Returns an error if configuration, the database, or the HTTP server
/// fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = Path::new(CONFIG_FILE);
    let config = load_config(config_path)?;

    init_logging(&config.logging);
    info!(
        config_file = CONFIG_FILE,
        found = config_path.exists(),
        "portcon-server starting"
    );

    let (repository, pool) = open_backend(&config.database).await?;

    let watcher = Arc::new(VersionWatcher::new(config.watch.max_wait()));
    let store = Arc::new(ScenarioStore::new(
        repository,
        watcher,
        config.store.acting_user.clone(),
    ));
    store.ping().await?;
    info!(
        acting_user = config.store.acting_user.as_str(),
        max_wait_ms = config.watch.max_wait_ms,
        "Scenario store ready"
    );

    let served = portcon_api::start_server(&config.server, Arc::new(AppState::new(store))).await;

    if let Some(pool) = pool {
        pool.close().await;
    }

    served.map_err(StartupError::from)?;
    Ok(())
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist. Environment overrides apply in both cases.
fn load_config(path: &Path) -> Result<PortconConfig, StartupError> {
    let config = if path.exists() {
        PortconConfig::from_file(path)?
    } else {
        PortconConfig::from_env()?
    };
    Ok(config)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match config.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

/// Open the configured repository. Returns the pool too when one was
/// created, so it can be closed on shutdown.
async fn open_backend(
    config: &DatabaseConfig,
) -> Result<(Arc<dyn ScenarioRepository>, Option<PostgresPool>), StartupError> {
    match config.backend {
        DatabaseBackend::Postgres => {
            let pool = PostgresPool::connect(
                &PostgresConfig::new(&config.url)
                    .with_max_connections(config.max_connections)
                    .with_acquire_timeout(config.connect_timeout())
                    .with_idle_timeout(config.idle_timeout()),
            )
            .await?;

            if config.run_migrations {
                pool.run_migrations().await?;
            } else {
                info!("Skipping database migrations");
            }

            let repository: Arc<dyn ScenarioRepository> = Arc::new(pool.scenario_repository());
            Ok((repository, Some(pool)))
        }
        DatabaseBackend::Memory => {
            warn!("Using the in-memory backend; scenarios are lost on restart");
            let repository: Arc<dyn ScenarioRepository> = Arc::new(MemoryScenarioRepository::new());
            Ok((repository, None))
        }
    }
}
