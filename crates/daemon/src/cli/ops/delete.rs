use clap::Args;

use common::prelude::{ShareLink, ShareLinkError};
use vaultdrop_daemon::http_server::api::client::ApiError;
use vaultdrop_daemon::http_server::api::v0::share::DeleteShareRequest;

#[derive(Args, Debug, Clone)]
pub struct Delete {
    /// Share ID or share link
    pub share: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("invalid share reference: {0}")]
    Reference(#[from] ShareLinkError),
    #[error("delete request failed: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Delete {
    type Error = DeleteError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let id = ShareLink::parse_id(&self.share)?;
        let response = ctx.client.call(DeleteShareRequest { id }).await?;

        if response.deleted {
            Ok(format!("share {} deleted", response.id))
        } else {
            Ok(format!("share {} was already gone", response.id))
        }
    }
}
