//! Google Drive API client.
//!
//! Concrete [`BlobStore`] implementation speaking the Drive v3 REST API with
//! a bearer token. Retry logic and error mapping live here so the store
//! engine above only sees the [`StorageError`] taxonomy.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tokio_retry::RetryIf;
use tracing::debug;
use url::Url;

use crate::clients::{AccountInfo, BlobStore, ObjectRef};
use crate::core::config::AppConfig;
use crate::errors::StorageError;

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Deserialize)]
struct FileListResponse {
    files: Option<Vec<DriveFile>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    modified_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMeta {
    modified_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AboutResponse {
    user: AboutUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AboutUser {
    email_address: String,
    display_name: Option<String>,
}

/// Drive API client with retry logic and error mapping.
pub struct DriveClient {
    http: Client,
    token: String,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    pub fn new(config: &AppConfig) -> Result<Self, StorageError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| StorageError::Permanent(format!("http client: {e}")))?;

        Url::parse(&config.drive_api_base)
            .map_err(|e| StorageError::Permanent(format!("invalid DRIVE_API_BASE: {e}")))?;
        Url::parse(&config.drive_upload_base)
            .map_err(|e| StorageError::Permanent(format!("invalid DRIVE_UPLOAD_BASE: {e}")))?;

        Ok(Self {
            http,
            token: config.drive_access_token.clone(),
            api_base: config.drive_api_base.trim_end_matches('/').to_string(),
            upload_base: config.drive_upload_base.trim_end_matches('/').to_string(),
        })
    }

    /// Retry transient failures only, with bounded exponential backoff.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, StorageError>> + Send,
        T: Send,
    {
        let strategy = ExponentialBackoff::from_millis(100).map(jitter).take(3);

        RetryIf::start(strategy, operation, StorageError::is_transient).await
    }

    async fn check(response: Response) -> Result<Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

fn status_error(status: StatusCode, body: &str) -> StorageError {
    match status.as_u16() {
        401 | 403 => StorageError::Connection(format!(
            "drive API rejected credentials ({status}): {body}"
        )),
        404 => StorageError::NotFound(format!("drive object not found: {body}")),
        429 => StorageError::Transient(format!("drive API rate limited: {body}")),
        s if s >= 500 => StorageError::Transient(format!("drive API error {status}: {body}")),
        _ => StorageError::Permanent(format!("drive API error {status}: {body}")),
    }
}

/// Escape a value for embedding in a Drive `q` filter string.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[async_trait]
impl BlobStore for DriveClient {
    async fn about(&self) -> Result<AccountInfo, StorageError> {
        self.with_retry(|| async {
            let response = self
                .http
                .get(format!("{}/about", self.api_base))
                .bearer_auth(&self.token)
                .query(&[("fields", "user")])
                .send()
                .await?;
            let about: AboutResponse = Self::check(response).await?.json().await?;
            Ok(AccountInfo {
                email: about.user.email_address,
                display_name: about.user.display_name,
            })
        })
        .await
    }

    async fn find_object(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<Option<ObjectRef>, StorageError> {
        let q = match parent {
            Some(parent_id) => format!(
                "name='{}' and '{}' in parents and trashed=false",
                escape_query(name),
                escape_query(parent_id)
            ),
            None => format!(
                "name='{}' and mimeType='{FOLDER_MIME_TYPE}' and trashed=false",
                escape_query(name)
            ),
        };

        self.with_retry(|| async {
            let response = self
                .http
                .get(format!("{}/files", self.api_base))
                .bearer_auth(&self.token)
                .query(&[
                    ("q", q.as_str()),
                    ("fields", "files(id, name, modifiedTime)"),
                    ("spaces", "drive"),
                ])
                .send()
                .await?;
            let listing: FileListResponse = Self::check(response).await?.json().await?;

            // Drive listings report objects in creation order; adopting the
            // first entry gives first-writer-wins when duplicates exist.
            Ok(listing.files.unwrap_or_default().into_iter().next().map(
                |file| ObjectRef {
                    id: file.id,
                    name: file.name,
                    modified_time: file.modified_time,
                },
            ))
        })
        .await
    }

    async fn create_container(&self, name: &str) -> Result<String, StorageError> {
        debug!(container = name, "creating storage container");
        self.with_retry(|| async {
            let response = self
                .http
                .post(format!("{}/files", self.api_base))
                .bearer_auth(&self.token)
                .query(&[("fields", "id")])
                .json(&json!({ "name": name, "mimeType": FOLDER_MIME_TYPE }))
                .send()
                .await?;
            let created: CreatedFile = Self::check(response).await?.json().await?;
            Ok(created.id)
        })
        .await
    }

    async fn create_object(
        &self,
        name: &str,
        parent: &str,
        content: &[u8],
    ) -> Result<ObjectRef, StorageError> {
        debug!(object = name, parent, "creating storage object");
        // Two-step create: metadata first, then content via media upload.
        let created: CreatedFile = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(format!("{}/files", self.api_base))
                    .bearer_auth(&self.token)
                    .query(&[("fields", "id")])
                    .json(&json!({ "name": name, "parents": [parent] }))
                    .send()
                    .await?;
                Ok(Self::check(response).await?.json().await?)
            })
            .await?;

        let modified_time = self.write_object(&created.id, content).await?;

        Ok(ObjectRef {
            id: created.id,
            name: name.to_string(),
            modified_time: Some(modified_time),
        })
    }

    async fn read_object(
        &self,
        object_id: &str,
    ) -> Result<(Vec<u8>, DateTime<Utc>), StorageError> {
        self.with_retry(|| async {
            let response = self
                .http
                .get(format!("{}/files/{object_id}", self.api_base))
                .bearer_auth(&self.token)
                .query(&[("fields", "modifiedTime")])
                .send()
                .await?;
            let meta: FileMeta = Self::check(response).await?.json().await?;

            let response = self
                .http
                .get(format!("{}/files/{object_id}", self.api_base))
                .bearer_auth(&self.token)
                .query(&[("alt", "media")])
                .send()
                .await?;
            let content = Self::check(response).await?.bytes().await?;

            Ok((content.to_vec(), meta.modified_time))
        })
        .await
    }

    async fn write_object(
        &self,
        object_id: &str,
        content: &[u8],
    ) -> Result<DateTime<Utc>, StorageError> {
        self.with_retry(|| async {
            let response = self
                .http
                .patch(format!("{}/files/{object_id}", self.upload_base))
                .bearer_auth(&self.token)
                .query(&[("uploadType", "media"), ("fields", "modifiedTime")])
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(content.to_vec())
                .send()
                .await?;
            let meta: FileMeta = Self::check(response).await?.json().await?;
            Ok(meta.modified_time)
        })
        .await
    }
}
