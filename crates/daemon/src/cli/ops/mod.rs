pub mod daemon;
pub mod delete;
pub mod health;
pub mod info;
pub mod recv;
pub mod send;
pub mod stats;
pub mod version;

pub use daemon::Daemon;
pub use delete::Delete;
pub use health::Health;
pub use info::Info;
pub use recv::Recv;
pub use send::Send;
pub use stats::Stats;
pub use version::Version;
