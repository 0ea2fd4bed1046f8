use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::http_server::api::client::ApiRequest;
use crate::ledger::{LedgerError, UploadMeta};
use crate::ServiceState;

const FALLBACK_MIME: &str = "application/octet-stream";
const MAX_NAME_CHARS: usize = 200;

/// Client-side request shape for the upload operation. The server consumes
/// multipart directly; this struct exists so the CLI builds the same form.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Name shown to the receiver (display only, sanitized server-side)
    pub file_name: String,
    /// MIME hint for the eventual plaintext (display only)
    pub mime_hint: Option<String>,
    /// The sealed envelope bytes. Already ciphertext from the server's
    /// perspective; the server never sees anything else.
    pub data: Vec<u8>,
    /// Requested download allowance (clamped server-side)
    pub max_downloads: Option<i64>,
    /// Requested lifetime in hours (clamped server-side)
    pub expiry_hours: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub display_name: String,
    pub byte_size: i64,
    pub max_downloads: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

pub async fn handler(
    State(state): State<ServiceState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, UploadError> {
    let form = parse_form(multipart).await?;

    let limits = state.limits();
    let max_downloads = limits.clamp_downloads(form.max_downloads);
    let expiry_hours = limits.clamp_expiry_hours(form.expiry_hours);

    let meta = UploadMeta {
        display_name: sanitize_display_name(form.file_name.as_deref()),
        mime_hint: form.mime_hint.unwrap_or_else(|| FALLBACK_MIME.to_string()),
    };

    let record = state
        .ledger()
        .create(
            form.data,
            meta,
            max_downloads,
            time::Duration::hours(expiry_hours),
        )
        .await?;

    Ok((
        http::StatusCode::CREATED,
        Json(UploadResponse {
            id: *record.id,
            display_name: record.display_name,
            byte_size: record.byte_size,
            max_downloads: record.max_downloads,
            expires_at: record.expires_at,
        }),
    )
        .into_response())
}

struct UploadForm {
    file_name: Option<String>,
    mime_hint: Option<String>,
    data: Bytes,
    max_downloads: Option<i64>,
    expiry_hours: Option<i64>,
}

async fn parse_form(mut multipart: Multipart) -> Result<UploadForm, UploadError> {
    let mut file: Option<(Option<String>, Option<String>, Bytes)> = None;
    let mut max_downloads = None;
    let mut expiry_hours = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Malformed(e.to_string()))?
    {
        let name = field.name().map(ToString::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(ToString::to_string);
                let mime_hint = field.content_type().map(ToString::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| UploadError::Malformed(e.to_string()))?;
                file = Some((file_name, mime_hint, data));
            }
            // Unparseable numbers fall back to the configured defaults, the
            // same leniency the clamp applies to out-of-range values.
            Some("max_downloads") => {
                max_downloads = field.text().await.ok().and_then(|t| t.trim().parse().ok());
            }
            Some("expiry_hours") => {
                expiry_hours = field.text().await.ok().and_then(|t| t.trim().parse().ok());
            }
            _ => {}
        }
    }

    let (file_name, mime_hint, data) = file.ok_or(UploadError::MissingFile)?;
    if data.is_empty() {
        return Err(UploadError::MissingFile);
    }

    Ok(UploadForm {
        file_name,
        mime_hint,
        data,
        max_downloads,
        expiry_hours,
    })
}

/// Sanitize a client-supplied filename for display and response headers.
/// Keeps alphanumerics (any script) plus `.`, `-`, `_`; everything else
/// collapses to a single underscore.
fn sanitize_display_name(name: Option<&str>) -> String {
    let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
        return "unnamed_file".to_string();
    };

    let mut out = String::with_capacity(name.len());
    let mut last_was_underscore = false;
    for c in name.chars().take(MAX_NAME_CHARS) {
        if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
            last_was_underscore = c == '_';
            out.push(c);
        } else if !last_was_underscore {
            last_was_underscore = true;
            out.push('_');
        }
    }

    if out.trim_matches('_').is_empty() {
        "unnamed_file".to_string()
    } else {
        out
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no file provided")]
    MissingFile,
    #[error("malformed upload: {0}")]
    Malformed(String),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::MissingFile => (
                http::StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "no file provided"})),
            )
                .into_response(),
            UploadError::Malformed(msg) => (
                http::StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": format!("malformed upload: {}", msg)})),
            )
                .into_response(),
            UploadError::Ledger(e) => {
                tracing::error!(error = %e, "upload failed");
                (
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": "upload failed"})),
                )
                    .into_response()
            }
        }
    }
}

// Client implementation - builds request for this operation
impl ApiRequest for UploadRequest {
    type Response = UploadResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/api/v0/share").unwrap();

        let mut part = reqwest::multipart::Part::bytes(self.data).file_name(self.file_name);
        if let Some(mime) = &self.mime_hint {
            part = part.mime_str(mime).expect("valid mime string");
        }

        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(n) = self.max_downloads {
            form = form.text("max_downloads", n.to_string());
        }
        if let Some(h) = self.expiry_hours {
            form = form.text("expiry_hours", h.to_string());
        }

        client.post(full_url).multipart(form)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sanitize_keeps_ordinary_names() {
        assert_eq!(
            sanitize_display_name(Some("report-2024_final.pdf")),
            "report-2024_final.pdf"
        );
        assert_eq!(sanitize_display_name(Some("résumé.txt")), "résumé.txt");
    }

    #[test]
    fn test_sanitize_collapses_junk() {
        assert_eq!(sanitize_display_name(Some("my file (1).txt")), "my_file_1_.txt");
        assert_eq!(
            sanitize_display_name(Some("a///..//b\"; rm -rf.sh")),
            "a_.._b_rm_-rf.sh"
        );
    }

    #[test]
    fn test_sanitize_empty_inputs() {
        assert_eq!(sanitize_display_name(None), "unnamed_file");
        assert_eq!(sanitize_display_name(Some("")), "unnamed_file");
        assert_eq!(sanitize_display_name(Some("   ")), "unnamed_file");
        assert_eq!(sanitize_display_name(Some("///")), "unnamed_file");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_display_name(Some(&long)).chars().count(), 200);
    }
}
