use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use object_store::ObjectStoreConfig;
use vaultdrop_daemon::{spawn_service, ServiceConfig, ShareLimits};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Port for the API server
    #[arg(long, default_value_t = 3001)]
    pub api_port: u16,

    /// Path to the sqlite database (in-memory if not set)
    #[arg(long)]
    pub sqlite_path: Option<PathBuf>,

    /// Directory for blob storage (in-memory if not set)
    #[arg(long)]
    pub blob_dir: Option<PathBuf>,

    /// Seconds between sweeper passes
    #[arg(long, default_value_t = 3600)]
    pub sweep_period_secs: u64,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("daemon failed: {0}")]
    Failed(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let blob_store = match &self.blob_dir {
            Some(path) => ObjectStoreConfig::Local { path: path.clone() },
            None => ObjectStoreConfig::Memory,
        };

        let config = ServiceConfig {
            api_port: self.api_port,
            blob_store,
            sqlite_path: self.sqlite_path.clone(),
            limits: ShareLimits::default(),
            sweep_period: Duration::from_secs(self.sweep_period_secs),
            log_level: tracing::Level::INFO,
            log_dir: self.log_dir.clone(),
        };

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
