use clap::Args;

use vaultdrop_daemon::http_server::api::client::ApiError;
use vaultdrop_daemon::http_server::api::v0::stats::StatsRequest;

#[derive(Args, Debug, Clone)]
pub struct Stats;

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("stats request failed: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Stats {
    type Error = StatsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let stats = ctx.client.call(StatsRequest).await?;

        let last_upload = stats
            .last_upload_at
            .map(|t| t.to_string())
            .unwrap_or_else(|| "never".to_string());

        Ok(format!(
            "shares:\n  active:  {}\n  deleted: {}\n  total:   {}\n  bytes:   {} (active)\n  last upload: {}",
            stats.active_shares,
            stats.deleted_shares,
            stats.total_shares,
            stats.active_bytes,
            last_upload,
        ))
    }
}
