use clap::Args;

use common::prelude::{ShareLink, ShareLinkError};
use vaultdrop_daemon::http_server::api::client::ApiError;
use vaultdrop_daemon::http_server::api::v0::share::InfoRequest;

#[derive(Args, Debug, Clone)]
pub struct Info {
    /// Share ID or share link
    pub share: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InfoError {
    #[error("invalid share reference: {0}")]
    Reference(#[from] ShareLinkError),
    #[error("info request failed: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Info {
    type Error = InfoError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let id = ShareLink::parse_id(&self.share)?;
        let info = ctx.client.call(InfoRequest { id }).await?;

        Ok(format!(
            "share {}\n  name:      {}\n  size:      {} bytes (sealed)\n  mime:      {}\n  remaining: {}\n  expires:   {}\n  created:   {}",
            info.id,
            info.display_name,
            info.byte_size,
            info.mime_hint,
            info.remaining_downloads,
            info.expires_at,
            info.created_at,
        ))
    }
}
