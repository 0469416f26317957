//! Object storage boundary.
//!
//! The pipeline only ever needs two operations: copy an object down to a
//! local file, and copy a local file up as an object. `ObjectStore` names that
//! seam so orchestration can run against Google Cloud Storage in production and
//! an in-memory fake in tests. No retries, multipart or credential discovery
//! happen here.

use std::fs::{File, create_dir_all};
use std::path::Path;

use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::info;

use crate::config::RemoteConfig;
use crate::error::AppError;

const GCS_BASE_URL: &str = "https://storage.googleapis.com";

/// Fetch/put by bucket name and object key.
pub trait ObjectStore: Send + Sync {
    /// Download `bucket/key` to `local_path`, creating parent directories.
    fn fetch(&self, bucket: &str, key: &str, local_path: &Path) -> Result<(), AppError>;

    /// Upload the file at `local_path` as `bucket/key`.
    fn put(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), AppError>;
}

/// Google Cloud Storage over the JSON API.
pub struct GcsClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl GcsClient {
    pub fn from_config(remote: &RemoteConfig) -> Result<Self, AppError> {
        Self::with_base_url(GCS_BASE_URL, remote.access_token.clone())
    }

    /// Point the client at a different endpoint (e.g. a storage emulator).
    pub fn with_base_url(base_url: &str, access_token: Option<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::remote(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    /// `{base}/storage/v1/b/{bucket}/o/{key}?alt=media`, key percent-encoded as one segment.
    fn download_url(&self, bucket: &str, key: &str) -> Result<Url, AppError> {
        let mut url = self.parse_base()?;
        url.path_segments_mut()
            .map_err(|_| AppError::remote(format!("Invalid storage base URL '{}'.", self.base_url)))?
            .pop_if_empty()
            .extend(["storage", "v1", "b", bucket, "o", key]);
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }

    /// `{base}/upload/storage/v1/b/{bucket}/o?uploadType=media&name={key}`.
    fn upload_url(&self, bucket: &str, key: &str) -> Result<Url, AppError> {
        let mut url = self.parse_base()?;
        url.path_segments_mut()
            .map_err(|_| AppError::remote(format!("Invalid storage base URL '{}'.", self.base_url)))?
            .pop_if_empty()
            .extend(["upload", "storage", "v1", "b", bucket, "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key);
        Ok(url)
    }

    fn parse_base(&self) -> Result<Url, AppError> {
        Url::parse(&self.base_url)
            .map_err(|e| AppError::remote(format!("Invalid storage base URL '{}': {e}", self.base_url)))
    }

    fn authorize(&self, req: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.access_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

impl ObjectStore for GcsClient {
    fn fetch(&self, bucket: &str, key: &str, local_path: &Path) -> Result<(), AppError> {
        let url = self.download_url(bucket, key)?;
        let mut resp = self
            .authorize(self.client.get(url))
            .send()
            .map_err(|e| AppError::remote(format!("GCS download of gs://{bucket}/{key} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::remote(format!(
                "GCS download of gs://{bucket}/{key} failed with status {}.",
                resp.status()
            )));
        }

        if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)
                .map_err(|e| AppError::io(format!("Failed to create directory '{}': {e}", parent.display())))?;
        }
        let mut file = File::create(local_path)
            .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", local_path.display())))?;
        resp.copy_to(&mut file)
            .map_err(|e| AppError::remote(format!("Failed to read gs://{bucket}/{key}: {e}")))?;

        info!("Downloaded gs://{bucket}/{key} to {}", local_path.display());
        Ok(())
    }

    fn put(&self, local_path: &Path, bucket: &str, key: &str) -> Result<(), AppError> {
        let body = std::fs::read(local_path)
            .map_err(|e| AppError::io(format!("Failed to read '{}': {e}", local_path.display())))?;
        let url = self.upload_url(bucket, key)?;

        let resp = self
            .authorize(self.client.post(url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .map_err(|e| AppError::remote(format!("GCS upload to gs://{bucket}/{key} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::remote(format!(
                "GCS upload to gs://{bucket}/{key} failed with status {}.",
                resp.status()
            )));
        }

        let object: UploadedObject = resp
            .json()
            .map_err(|e| AppError::remote(format!("Failed to parse GCS upload response: {e}")))?;

        info!(
            size = object.size.as_deref().unwrap_or("?"),
            "Uploaded {} to gs://{}/{}",
            local_path.display(),
            object.bucket,
            object.name
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UploadedObject {
    name: String,
    bucket: String,
    /// GCS reports sizes as decimal strings.
    size: Option<String>,
}
