use std::path::PathBuf;

use clap::Args;

use common::prelude::{EnvelopeError, EnvelopeKey, ShareLink};
use vaultdrop_daemon::http_server::api::client::ApiError;
use vaultdrop_daemon::http_server::api::v0::share::UploadRequest;

/// Encrypt a file locally and upload the ciphertext.
///
/// The envelope key is generated here, rides only in the printed link's
/// fragment, and is never part of the upload request.
#[derive(Args, Debug, Clone)]
pub struct Send {
    /// File to share
    pub file: PathBuf,

    /// Download allowance to request (the server clamps this into its range)
    #[arg(long)]
    pub max_downloads: Option<i64>,

    /// Lifetime to request in hours (the server clamps this into its range)
    #[arg(long)]
    pub expiry_hours: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("could not read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("encryption failed: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("upload failed: {0}")]
    Api(#[from] ApiError),
    #[error("invalid remote URL: {0}")]
    Remote(#[from] url::ParseError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Send {
    type Error = SendError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let plaintext = tokio::fs::read(&self.file)
            .await
            .map_err(|e| SendError::Read(self.file.clone(), e))?;

        let file_name = self
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed_file")
            .to_string();
        let mime_hint = mime_guess::from_path(&self.file)
            .first_or_octet_stream()
            .to_string();

        let key = EnvelopeKey::generate();
        let sealed = key.encrypt(&plaintext)?;

        let response = ctx
            .client
            .call(UploadRequest {
                file_name,
                mime_hint: Some(mime_hint),
                data: sealed,
                max_downloads: self.max_downloads,
                expiry_hours: self.expiry_hours,
            })
            .await?;

        let download_base = ctx.client.base_url().join("/api/v0/share")?;
        let link = ShareLink::new(&download_base, response.id, &key);

        Ok(format!(
            "{}\n\n  name:      {}\n  size:      {} bytes (sealed)\n  downloads: {}\n  expires:   {}",
            link,
            response.display_name,
            response.byte_size,
            response.max_downloads,
            response.expires_at,
        ))
    }
}
