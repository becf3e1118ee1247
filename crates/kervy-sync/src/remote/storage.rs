//! # Firebase Storage Client
//!
//! [`ImageStore`] over the Firebase Storage v0 REST API.
//!
//! ```text
//!  ImageSource ──► bytes ──► POST {storage}/v0/b/{bucket}/o?uploadType=media&name={path}
//!  (file path,      │                        │
//!   file:// URI,    │                        ▼
//!   or http URL)    │        { "name": ..., "downloadTokens": "tok,..." }
//!                   │                        │
//!                   └────────────────────────▼
//!        {storage}/v0/b/{bucket}/o/{encoded path}?alt=media&token={tok}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use kervy_core::ImageSource;

use super::{ImageStore, TokenCell};
use crate::config::FirebaseSettings;
use crate::error::{SyncError, SyncResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

/// Uploads product images to a Firebase Storage bucket.
pub struct FirebaseImageStore {
    client: Client,
    base_url: String,
    bucket: String,
    token: TokenCell,
}

impl FirebaseImageStore {
    pub fn new(settings: &FirebaseSettings, token: TokenCell) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SyncError::Internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(FirebaseImageStore {
            client,
            base_url: settings.storage_url.trim_end_matches('/').to_string(),
            bucket: settings.bucket(),
            token,
        })
    }

    /// Public download URL of an uploaded object.
    pub fn download_url(&self, object_name: &str, token: &str) -> String {
        format!(
            "{}/v0/b/{}/o/{}?alt=media&token={}",
            self.base_url,
            self.bucket,
            urlencoding::encode(object_name),
            token
        )
    }

    async fn read_bytes(&self, image: &ImageSource) -> SyncResult<Vec<u8>> {
        let read_failed = |reason: String| SyncError::ImageReadFailed {
            uri: image.uri.clone(),
            reason,
        };

        if image.is_remote() {
            let response = self
                .client
                .get(&image.uri)
                .send()
                .await
                .map_err(|e| read_failed(e.to_string()))?
                .error_for_status()
                .map_err(|e| read_failed(e.to_string()))?;
            let bytes = response.bytes().await.map_err(|e| read_failed(e.to_string()))?;
            return Ok(bytes.to_vec());
        }

        let path = image.uri.strip_prefix("file://").unwrap_or(&image.uri);
        tokio::fs::read(path)
            .await
            .map_err(|e| read_failed(e.to_string()))
    }
}

fn content_type(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}

#[async_trait]
impl ImageStore for FirebaseImageStore {
    async fn upload(&self, image: &ImageSource, path: &str) -> SyncResult<String> {
        let token = self.token.bearer().await?;

        let bytes = self.read_bytes(image).await?;
        debug!(path = %path, bytes = bytes.len(), "Uploading image");

        let url = format!("{}/v0/b/{}/o", self.base_url, self.bucket);
        let response = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", path)])
            .header("Authorization", format!("Firebase {}", token))
            .header("Content-Type", content_type(image.file_name()))
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Image upload rejected");
            return Err(SyncError::ImageUploadFailed(format!("HTTP {}: {}", status, body)));
        }

        let uploaded: UploadResponse = response.json().await?;
        let download_token = uploaded
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SyncError::ImageUploadFailed(format!("no download token for {}", uploaded.name))
            })?;

        let download_url = self.download_url(&uploaded.name, download_token);
        info!(path = %uploaded.name, "Image uploaded");
        Ok(download_url)
    }
}
