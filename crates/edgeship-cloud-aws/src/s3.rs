//! S3 origin bucket adapter and site publisher

use crate::error::{AwsError, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use edgeship_cloud::{SitePublisher, StorageApi, SyncReport};
use std::path::{Path, PathBuf};

/// Maximum keys per DeleteObjects request
const DELETE_BATCH: usize = 1000;

/// [`StorageApi`] over S3
pub struct S3Storage {
    client: Client,
}

impl S3Storage {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    /// Every object version and delete marker in the bucket
    async fn list_versions(&self, bucket: &str) -> Result<Vec<ObjectIdentifier>> {
        let mut identifiers = Vec::new();
        let mut key_marker: Option<String> = None;
        let mut version_marker: Option<String> = None;

        loop {
            let output = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.take())
                .set_version_id_marker(version_marker.take())
                .send()
                .await
                .map_err(|e| AwsError::api("ListObjectVersions", e))?;

            for version in output.versions() {
                if let Some(key) = version.key() {
                    identifiers.push(identifier(key, version.version_id())?);
                }
            }
            for marker in output.delete_markers() {
                if let Some(key) = marker.key() {
                    identifiers.push(identifier(key, marker.version_id())?);
                }
            }

            if !output.is_truncated().unwrap_or(false) {
                break;
            }
            key_marker = output.next_key_marker().map(str::to_string);
            version_marker = output.next_version_id_marker().map(str::to_string);
            if key_marker.is_none() {
                break;
            }
        }

        Ok(identifiers)
    }
}

fn identifier(key: &str, version_id: Option<&str>) -> Result<ObjectIdentifier> {
    Ok(ObjectIdentifier::builder()
        .key(key)
        .set_version_id(version_id.map(str::to_string))
        .build()?)
}

#[async_trait]
impl StorageApi for S3Storage {
    async fn bucket_exists(&self, name: &str) -> edgeship_cloud::Result<bool> {
        match self.client.head_bucket().bucket(name).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    return Ok(false);
                }
                let status = err.raw_response().map(|r| r.status().as_u16());
                match status {
                    Some(404) => Ok(false),
                    // 他アカウントが所有している名前も「存在する」扱い
                    Some(403) | Some(301) => Ok(true),
                    _ => Err(AwsError::api("HeadBucket", err).into()),
                }
            }
        }
    }

    async fn empty_bucket(&self, name: &str) -> edgeship_cloud::Result<()> {
        let identifiers = self.list_versions(name).await?;
        tracing::info!("Deleting {} object versions from {}", identifiers.len(), name);

        for chunk in identifiers.chunks(DELETE_BATCH) {
            let delete = Delete::builder()
                .set_objects(Some(chunk.to_vec()))
                .quiet(true)
                .build()
                .map_err(AwsError::from)?;
            self.client
                .delete_objects()
                .bucket(name)
                .delete(delete)
                .send()
                .await
                .map_err(|e| AwsError::api("DeleteObjects", e))?;
        }
        Ok(())
    }

    async fn delete_bucket(&self, name: &str) -> edgeship_cloud::Result<()> {
        tracing::info!("DeleteBucket {}", name);
        self.client
            .delete_bucket()
            .bucket(name)
            .send()
            .await
            .map_err(|e| AwsError::api("DeleteBucket", e))?;
        Ok(())
    }
}

/// Uploads a build directory with `PutObject`
pub struct S3Publisher {
    client: Client,
}

impl S3Publisher {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl SitePublisher for S3Publisher {
    async fn sync(&self, source: &Path, bucket: &str) -> edgeship_cloud::Result<SyncReport> {
        let files = collect_files(source)?;
        let mut report = SyncReport::default();

        for path in files {
            let Some(key) = object_key(source, &path) else {
                continue;
            };
            let size = tokio::fs::metadata(&path).await?.len();
            let body = ByteStream::from_path(&path)
                .await
                .map_err(|e| AwsError::Upload {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;

            tracing::debug!("PutObject s3://{}/{}", bucket, key);
            self.client
                .put_object()
                .bucket(bucket)
                .key(&key)
                .body(body)
                .content_type(content_type(&key))
                .cache_control(cache_control(&key))
                .send()
                .await
                .map_err(|e| AwsError::api("PutObject", e))?;

            report.uploaded += 1;
            report.bytes += size;
        }

        tracing::info!(
            "Uploaded {} files ({} bytes) to {}",
            report.uploaded,
            report.bytes,
            bucket
        );
        Ok(report)
    }
}

/// Regular files under `root`, sorted for stable upload order
fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && entry.file_name() != ".DS_Store" {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Object key of `path` relative to `root`, always `/`-separated
fn object_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

fn extension(key: &str) -> String {
    Path::new(key)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

fn content_type(key: &str) -> &'static str {
    match extension(key).as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "webmanifest" => "application/manifest+json",
        _ => "application/octet-stream",
    }
}

/// HTML is revalidated on every request; other assets are cached by the CDN TTLs
fn cache_control(key: &str) -> &'static str {
    match extension(key).as_str() {
        "html" | "htm" => "public, max-age=0, must-revalidate",
        _ => "public, max-age=86400",
    }
}
