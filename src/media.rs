//! Media hosting: the `MediaStore` seam, the Cloudinary client behind it,
//! an in-process store for development and tests, and the local staging of
//! multipart uploads.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{CloudinaryConfig, Config};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("media host request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("media host rejected the request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, path: &Path) -> Result<UploadedMedia, MediaError>;

    async fn delete(&self, public_id: &str) -> Result<(), MediaError>;

    /// Recovers the id `delete` expects from a URL this store handed out.
    fn public_id_from_url(&self, url: &str) -> Option<String> {
        cloudinary_public_id(url)
    }
}

pub fn media_store_from_config(config: &Config) -> anyhow::Result<Arc<dyn MediaStore>> {
    match &config.cloudinary {
        Some(cloudinary) => {
            info!(cloud = %cloudinary.cloud_name, "using cloudinary media store");
            let store = CloudinaryStore::new(cloudinary.clone(), config.media_timeout)?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("cloudinary credentials missing, media is kept in memory and lost on restart");
            Ok(Arc::new(MemoryMediaStore::new()))
        }
    }
}

// ----------------- Cloudinary -----------------

pub struct CloudinaryStore {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct UploadReply {
    url: String,
    secure_url: Option<String>,
    public_id: String,
}

#[derive(Deserialize)]
struct DestroyReply {
    result: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build media host client")?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/{}/{}",
            self.config.cloud_name, resource_type, action
        )
    }

    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut hasher = Sha1::new();
        hasher.update(string_to_sign(params).as_bytes());
        hasher.update(self.config.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// `key=value` pairs sorted by key and joined with `&`, as the host signs them.
pub(crate) fn string_to_sign(params: &[(&str, &str)]) -> String {
    let mut params = params.to_vec();
    params.sort_by(|a, b| a.0.cmp(b.0));
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn unix_timestamp() -> String {
    time::OffsetDateTime::now_utc().unix_timestamp().to_string()
}

async fn rejection(response: reqwest::Response) -> MediaError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    MediaError::Rejected(format!("{status}: {body}"))
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    async fn upload(&self, path: &Path) -> Result<UploadedMedia, MediaError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_owned();
        let timestamp = unix_timestamp();
        let signature = self.sign(&[("timestamp", timestamp.as_str())]);

        let form = reqwest::multipart::Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let response = self
            .client
            .post(self.endpoint("auto", "upload"))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let reply: UploadReply = response.json().await?;
        info!(public_id = %reply.public_id, "file uploaded to media host");
        Ok(UploadedMedia {
            url: reply.secure_url.unwrap_or(reply.url),
            public_id: reply.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        let timestamp = unix_timestamp();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", timestamp.as_str())]);
        let response = self
            .client
            .post(self.endpoint("image", "destroy"))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.config.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let reply: DestroyReply = response.json().await?;
        if reply.result != "ok" {
            return Err(MediaError::Rejected(reply.result));
        }
        info!(public_id, "deleted from media host");
        Ok(())
    }
}

/// `https://res.cloudinary.com/<cloud>/image/upload/v171/folder/cat.png`
/// maps to `folder/cat`.
pub fn cloudinary_public_id(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/upload/")?;
    let rest = rest.split(|c: char| c == '?' || c == '#').next()?;
    let mut segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > 1 && is_version_segment(segments[0]) {
        segments.remove(0);
    }
    let last = segments.pop()?;
    let stem = match last.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => last,
    };
    segments.push(stem);
    Some(segments.join("/"))
}

fn is_version_segment(segment: &str) -> bool {
    match segment.strip_prefix('v') {
        Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

// ----------------- In-memory store -----------------

const MEMORY_URL_PREFIX: &str = "memory://media/";

/// Keeps uploads in process memory. Serves development setups without media
/// host credentials and lets tests force upload or delete failures.
#[derive(Default)]
pub struct MemoryMediaStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicU64,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, public_id: &str) -> bool {
        self.lock().contains_key(public_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned map still holds consistent entries; keep serving it.
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(&self, path: &Path) -> Result<UploadedMedia, MediaError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(MediaError::Rejected("uploads are disabled".to_owned()));
        }
        let bytes = tokio::fs::read(path).await?;
        let public_id = format!("media-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.lock().insert(public_id.clone(), bytes);
        Ok(UploadedMedia {
            url: format!("{MEMORY_URL_PREFIX}{public_id}"),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(MediaError::Rejected("deletes are disabled".to_owned()));
        }
        match self.lock().remove(public_id) {
            Some(_) => Ok(()),
            None => Err(MediaError::Rejected(format!("{public_id} not found"))),
        }
    }

    fn public_id_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(MEMORY_URL_PREFIX)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
    }
}

// ----------------- Staging -----------------

/// A multipart upload written to the staging directory. Consumed by
/// `upload`, which removes the local copy whatever the host answers.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub async fn stage(
        dir: &Path,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<Self, MediaError> {
        tokio::fs::create_dir_all(dir).await?;
        let extension = original_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|extension| extension.to_str())
            .filter(|extension| extension.chars().all(|c| c.is_ascii_alphanumeric()));
        let file_name = match extension {
            Some(extension) => format!("{}.{}", Uuid::new_v4(), extension.to_lowercase()),
            None => Uuid::new_v4().to_string(),
        };
        let path = dir.join(file_name);
        if let Err(error) = tokio::fs::write(&path, bytes).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(error.into());
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn upload(self, store: &dyn MediaStore) -> Result<UploadedMedia, MediaError> {
        let result = store.upload(&self.path).await;
        self.discard().await;
        result
    }

    async fn discard(self) {
        if let Err(error) = tokio::fs::remove_file(&self.path).await {
            warn!(path = %self.path.display(), %error, "failed to remove staged upload");
        }
    }
}

// ----------------- Cleanup -----------------

/// What happened to media that a successful operation made obsolete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Clean,
    Skipped,
    Failed { public_id: String, reason: String },
}

impl CleanupOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, CleanupOutcome::Failed { .. })
    }

    /// Suffix for the success message when stale media was left behind.
    pub fn notice(&self) -> &'static str {
        if self.is_failed() {
            " (previous media could not be removed)"
        } else {
            ""
        }
    }
}

/// Deletes media behind `url` on a best-effort basis. Failures are logged
/// for manual reconciliation and never propagated.
pub async fn discard_media(store: &dyn MediaStore, url: Option<&str>) -> CleanupOutcome {
    let url = match url {
        Some(url) if !url.is_empty() => url,
        _ => return CleanupOutcome::Skipped,
    };
    let public_id = match store.public_id_from_url(url) {
        Some(public_id) => public_id,
        None => {
            warn!(url, "unrecognised media url, leaving it on the host");
            return CleanupOutcome::Failed {
                public_id: url.to_owned(),
                reason: "unrecognised media url".to_owned(),
            };
        }
    };
    match store.delete(&public_id).await {
        Ok(()) => CleanupOutcome::Clean,
        Err(error) => {
            warn!(%public_id, %error, "failed to delete stale media");
            CleanupOutcome::Failed {
                public_id,
                reason: error.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_string_is_sorted() {
        assert_eq!(
            string_to_sign(&[("timestamp", "1315060510"), ("public_id", "sample")]),
            "public_id=sample&timestamp=1315060510"
        );
    }

    #[test]
    fn public_id_from_hosted_urls() {
        assert_eq!(
            cloudinary_public_id(
                "http://res.cloudinary.com/demo/image/upload/v1712345678/sample.jpg"
            )
            .as_deref(),
            Some("sample")
        );
        assert_eq!(
            cloudinary_public_id("https://res.cloudinary.com/demo/image/upload/arts/cat.png?x=1")
                .as_deref(),
            Some("arts/cat")
        );
        assert_eq!(cloudinary_public_id("https://example.com/cat.png"), None);
    }

    #[tokio::test]
    async fn staged_file_is_removed_after_failed_upload() {
        let dir = std::env::temp_dir().join(format!("artgallery-stage-{}", Uuid::new_v4()));
        let store = MemoryMediaStore::new();
        store.set_fail_uploads(true);

        let staged = StagedFile::stage(&dir, Some("cat.PNG"), b"pixels")
            .await
            .unwrap();
        let path = staged.path().to_path_buf();
        assert_eq!(path.extension().unwrap(), "png");
        assert!(path.exists());

        assert!(staged.upload(&store).await.is_err());
        assert!(!path.exists());
        assert!(store.is_empty());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn discard_reports_failures_without_erroring() {
        let dir = std::env::temp_dir().join(format!("artgallery-stage-{}", Uuid::new_v4()));
        let store = MemoryMediaStore::new();
        let staged = StagedFile::stage(&dir, None, b"pixels").await.unwrap();
        let media = staged.upload(&store).await.unwrap();
        assert!(store.contains(&media.public_id));

        store.set_fail_deletes(true);
        let outcome = discard_media(&store, Some(&media.url)).await;
        assert!(outcome.is_failed());
        assert!(store.contains(&media.public_id));

        store.set_fail_deletes(false);
        assert_eq!(
            discard_media(&store, Some(&media.url)).await,
            CleanupOutcome::Clean
        );
        assert_eq!(discard_media(&store, None).await, CleanupOutcome::Skipped);
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
