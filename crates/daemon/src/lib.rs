// Service modules (daemon functionality)
pub mod database;
pub mod http_server;
pub mod ledger;
pub mod process;
pub mod service_config;
pub mod service_state;
pub mod tasks;

// Re-exports for consumers
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use service_config::{Config as ServiceConfig, ShareLimits};
pub use service_state::State as ServiceState;
