use std::path::PathBuf;

use clap::Args;

use common::prelude::{EnvelopeError, ShareLink, ShareLinkError};

/// Download a share and decrypt it locally.
///
/// Consumes one unit of the share's download allowance. Decryption happens
/// entirely on this machine with the key from the link fragment.
#[derive(Args, Debug, Clone)]
pub struct Recv {
    /// The share link, including its #key fragment
    pub link: String,

    /// Where to write the decrypted file (defaults to the shared name)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecvError {
    #[error("invalid share link: {0}")]
    Link(#[from] ShareLinkError),
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("share is gone: {0}")]
    Gone(String),
    #[error("decryption failed: the envelope was tampered with or the link key is wrong")]
    Envelope(#[from] EnvelopeError),
    #[error("could not write {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("invalid remote URL: {0}")]
    Remote(#[from] url::ParseError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Recv {
    type Error = RecvError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let share = ShareLink::parse(&self.link)?;

        let url = ctx
            .client
            .base_url()
            .join(&format!("/api/v0/share/{}", share.id()))?;
        let response = ctx.client.http_client().get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RecvError::Gone(format!("{}: {}", status, body)));
        }

        let remaining = response
            .headers()
            .get("x-remaining-downloads")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let served_name = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename);

        let sealed = response.bytes().await?;
        let plaintext = share.key().decrypt(&sealed)?;

        let output = self.output.clone().unwrap_or_else(|| {
            PathBuf::from(served_name.unwrap_or_else(|| share.id().to_string()))
        });
        tokio::fs::write(&output, &plaintext)
            .await
            .map_err(|e| RecvError::Write(output.clone(), e))?;

        let mut summary = format!("wrote {} ({} bytes)", output.display(), plaintext.len());
        if let Some(remaining) = remaining {
            summary.push_str(&format!(", {} downloads remaining", remaining));
        }
        Ok(summary)
    }
}

/// Pull the filename out of an `attachment; filename="..."` header.
fn disposition_filename(disposition: &str) -> Option<String> {
    let start = disposition.find("filename=\"")? + "filename=\"".len();
    let rest = &disposition[start..];
    let end = rest.find('"')?;
    let name = &rest[..end];
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_disposition_filename() {
        assert_eq!(
            disposition_filename("attachment; filename=\"notes.txt\""),
            Some("notes.txt".to_string())
        );
        assert_eq!(disposition_filename("attachment"), None);
        assert_eq!(disposition_filename("attachment; filename=\"\""), None);
    }
}
