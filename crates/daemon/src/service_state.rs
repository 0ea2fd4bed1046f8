use std::sync::Arc;

use url::Url;

use object_store::BlobStore;

use crate::database::{Database, DatabaseSetupError};
use crate::ledger::{Ledger, SystemClock};
use crate::service_config::{Config, ShareLimits};

/// Main service state - the record store, the blob store, and the ledger
/// that ties them together.
#[derive(Clone)]
pub struct State {
    database: Database,
    ledger: Ledger,
    limits: ShareLimits,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        // 1. Setup database
        let sqlite_database_url = match config.sqlite_path {
            Some(ref path) => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| StateSetupError::DatabasePath(e.to_string()))?;
                }
                Url::parse(&format!("sqlite://{}", path.display()))
                    .map_err(|_| StateSetupError::InvalidDatabaseUrl)
            }
            // otherwise just set up an in-memory database
            None => Url::parse("sqlite::memory:").map_err(|_| StateSetupError::InvalidDatabaseUrl),
        }?;
        tracing::info!("Database URL: {:?}", sqlite_database_url);
        let database = Database::connect(&sqlite_database_url).await?;

        // 2. Setup blob store
        let blobs = BlobStore::new(config.blob_store.clone())
            .await
            .map_err(|e| StateSetupError::BlobStore(e.to_string()))?;

        // 3. Ledger over both, on the real clock
        let ledger = Ledger::new(database.clone(), blobs, Arc::new(SystemClock));

        Ok(Self {
            database,
            ledger,
            limits: config.limits,
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn limits(&self) -> &ShareLimits {
        &self.limits
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("could not prepare database path: {0}")]
    DatabasePath(String),
    #[error("Database setup error: {0}")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,
    #[error("Blob store error: {0}")]
    BlobStore(String),
}
