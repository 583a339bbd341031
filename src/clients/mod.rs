//! Client modules for external API interactions.

pub mod drive_client;

pub use drive_client::DriveClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::StorageError;

/// Reference to a remote object as reported by a listing.
#[derive(Debug, Clone)]
pub struct ObjectRef {
    pub id: String,
    pub name: String,
    pub modified_time: Option<DateTime<Utc>>,
}

/// Identity of the account backing the blob store session.
#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub email: String,
    pub display_name: Option<String>,
}

/// Capability contract over the remote file-hosting service.
///
/// The store treats this as its sole source of durability: whole-object
/// read/write/list, a modification timestamp per object, no locking. Every
/// method is a suspension point and may fail `Transient` (retryable) or with
/// a permanent variant of [`StorageError`].
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Verify connectivity and report the authenticated account.
    async fn about(&self) -> Result<AccountInfo, StorageError>;

    /// Find an object by name, scoped to a parent container when given.
    /// A lookup without a parent targets a container.
    async fn find_object(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<Option<ObjectRef>, StorageError>;

    /// Create a container, returning its id.
    async fn create_container(&self, name: &str) -> Result<String, StorageError>;

    /// Create an object with initial content inside a container.
    async fn create_object(
        &self,
        name: &str,
        parent: &str,
        content: &[u8],
    ) -> Result<ObjectRef, StorageError>;

    /// Read an object's content and current modification timestamp.
    async fn read_object(
        &self,
        object_id: &str,
    ) -> Result<(Vec<u8>, DateTime<Utc>), StorageError>;

    /// Replace an object's content, returning the new modification timestamp.
    async fn write_object(
        &self,
        object_id: &str,
        content: &[u8],
    ) -> Result<DateTime<Utc>, StorageError>;
}
