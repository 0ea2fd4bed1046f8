pub use clap::Parser;

use url::Url;

#[derive(Parser, Debug)]
#[command(name = "vaultdrop")]
#[command(about = "Zero-knowledge ephemeral file sharing")]
pub struct Args {
    /// Base URL of the vaultdrop daemon
    #[arg(long, global = true, default_value = "http://localhost:3001")]
    pub remote: Url,

    #[command(subcommand)]
    pub command: crate::Command,
}
