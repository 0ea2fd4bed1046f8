use std::path::PathBuf;
use std::time::Duration;

use object_store::ObjectStoreConfig;

/// Daemon service configuration.
#[derive(Debug)]
pub struct Config {
    // http server configuration
    /// Port for the HTTP server (upload, download, info, stats, delete).
    pub api_port: u16,

    // storage configuration
    /// Blob storage backend configuration
    pub blob_store: ObjectStoreConfig,
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // lifecycle configuration
    /// Bounds and defaults applied to upload requests
    pub limits: ShareLimits,
    /// How often the sweeper scans for stale shares
    pub sweep_period: Duration,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

/// Bounds applied to client-requested share limits.
///
/// Requested values are clamped into the configured inclusive ranges rather
/// than rejected, matching the upload contract: a request for 10000 downloads
/// yields a share capped at the maximum.
#[derive(Debug, Clone, Copy)]
pub struct ShareLimits {
    pub min_downloads: i64,
    pub max_downloads: i64,
    pub default_downloads: i64,
    pub min_expiry_hours: i64,
    pub max_expiry_hours: i64,
    pub default_expiry_hours: i64,
}

impl Default for ShareLimits {
    fn default() -> Self {
        Self {
            min_downloads: 1,
            max_downloads: 100,
            default_downloads: 1,
            min_expiry_hours: 1,
            max_expiry_hours: 168,
            default_expiry_hours: 24,
        }
    }
}

impl ShareLimits {
    /// Clamp a requested download allowance into range, defaulting when absent.
    pub fn clamp_downloads(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_downloads)
            .clamp(self.min_downloads, self.max_downloads)
    }

    /// Clamp a requested expiry into range, defaulting when absent.
    pub fn clamp_expiry_hours(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_expiry_hours)
            .clamp(self.min_expiry_hours, self.max_expiry_hours)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp_downloads() {
        let limits = ShareLimits::default();
        assert_eq!(limits.clamp_downloads(None), 1);
        assert_eq!(limits.clamp_downloads(Some(0)), 1);
        assert_eq!(limits.clamp_downloads(Some(-3)), 1);
        assert_eq!(limits.clamp_downloads(Some(5)), 5);
        assert_eq!(limits.clamp_downloads(Some(100)), 100);
        assert_eq!(limits.clamp_downloads(Some(10_000)), 100);
    }

    #[test]
    fn test_clamp_expiry() {
        let limits = ShareLimits::default();
        assert_eq!(limits.clamp_expiry_hours(None), 24);
        assert_eq!(limits.clamp_expiry_hours(Some(0)), 1);
        assert_eq!(limits.clamp_expiry_hours(Some(72)), 72);
        assert_eq!(limits.clamp_expiry_hours(Some(1_000)), 168);
    }
}
