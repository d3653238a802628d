//! Remote media store client.
//!
//! Product images live at a remote object store, not on this host. This
//! module defines the small surface the lifecycle service needs (`upload`
//! bytes into a folder, `delete` by public id), an HTTP implementation of
//! it, and the pure public-id derivation that maps a previously issued URL
//! back to a deletable resource identifier.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Logical folder at the media store under which all catalog images are
/// grouped. Also the prefix of every public id this service derives.
pub const IMAGE_FOLDER: &str = "furniture_products";

#[derive(Debug, Error)]
pub enum MediaStoreError {
    #[error("media store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("media store returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("media store response missing expected fields: {0}")]
    MalformedResponse(String),
}

pub type MediaStoreResult<T> = Result<T, MediaStoreError>;

/// Upload/delete operations against the remote media store.
///
/// `delete` returns a real `Result` even though production call sites log
/// and discard it: a failed remote deletion must never block the product
/// mutation it accompanies, but tests still assert on the outcome.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload raw image bytes under `folder`, returning the durable URL the
    /// store assigned. No retry; transport and HTTP errors propagate.
    async fn upload(&self, bytes: Bytes, folder: &str) -> MediaStoreResult<String>;

    /// Request deletion of the object with the given public id.
    async fn delete(&self, public_id: &str) -> MediaStoreResult<()>;
}

/// Derive the deletable public id for a URL this service issued.
///
/// Takes the last non-empty `/`-separated segment, strips everything from
/// the final `.` onward, and prefixes the folder: `.../abc123.jpg` becomes
/// `furniture_products/abc123`. Returns `None` for anything that does not
/// match that shape (no segments, no extension) — callers treat `None` as
/// "nothing to delete". Extension-less identifiers are unsupported.
pub fn public_id_for_url(url: &str) -> Option<String> {
    let segment = url.rsplit('/').find(|s| !s.is_empty())?;
    let stem_len = segment.rfind('.')?;
    Some(format!("{}/{}", IMAGE_FOLDER, &segment[..stem_len]))
}

/// Successful upload body: the store echoes back where the object lives.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// `MediaStore` implementation over the store's HTTP API.
///
/// Uploads are `POST {base}/upload` multipart forms carrying the file part
/// and a `folder` field; deletions are `DELETE {base}/resources/{id}`.
/// Requests authenticate with basic auth (api key/secret).
#[derive(Clone)]
pub struct HttpMediaStore {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl HttpMediaStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("furniture-catalog/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        })
    }

    async fn check_status(response: reqwest::Response) -> MediaStoreResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(MediaStoreError::Status { status, body })
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn upload(&self, bytes: Bytes, folder: &str) -> MediaStoreResult<String> {
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes.to_vec()).file_name("image"),
            )
            .text("folder", folder.to_string());

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .multipart(form)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|err| MediaStoreError::MalformedResponse(err.to_string()))?;
        Ok(body.secure_url)
    }

    async fn delete(&self, public_id: &str) -> MediaStoreResult<()> {
        let response = self
            .client
            .delete(format!("{}/resources/{}", self.base_url, public_id))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}
