#![allow(dead_code)] // not every test binary uses every helper

//! In-memory `BlobStore` used by the integration tests: whole-object
//! read/write with a monotonically increasing modification timestamp, plus
//! switches for injecting write failures and auth failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drivedb::clients::{AccountInfo, BlobStore, ObjectRef};
use drivedb::errors::StorageError;

pub const ACCOUNT_EMAIL: &str = "service@example.com";

struct StoredObject {
    id: String,
    name: String,
    parent: String,
    content: Vec<u8>,
    modified: DateTime<Utc>,
}

struct Inner {
    containers: Vec<(String, String)>, // (name, id) in creation order
    objects: Vec<StoredObject>,        // creation order
    counter: u64,
    clock: i64,
    fail_writes: bool,
    authorized: bool,
}

/// Cloning shares the underlying state, so several stores can contend for
/// the same "remote" document like separate processes would.
#[derive(Clone)]
pub struct MemoryBlobStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                containers: Vec::new(),
                objects: Vec::new(),
                counter: 0,
                clock: 0,
                fail_writes: false,
                authorized: true,
            })),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_writes = fail;
    }

    pub fn set_authorized(&self, authorized: bool) {
        self.inner.lock().unwrap().authorized = authorized;
    }

    pub fn container_count(&self) -> usize {
        self.inner.lock().unwrap().containers.len()
    }

    pub fn object_count(&self) -> usize {
        self.inner.lock().unwrap().objects.len()
    }

    /// Drop an object entirely, as an operator deleting it out-of-band would.
    pub fn remove_object(&self, object_id: &str) {
        self.inner
            .lock()
            .unwrap()
            .objects
            .retain(|o| o.id != object_id);
    }
}

impl Inner {
    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{prefix}-{}", self.counter)
    }

    fn next_time(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        DateTime::from_timestamp(self.clock, 0).unwrap()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn about(&self) -> Result<AccountInfo, StorageError> {
        let inner = self.inner.lock().unwrap();
        if !inner.authorized {
            return Err(StorageError::Connection(
                "storage account is not connected".to_string(),
            ));
        }
        Ok(AccountInfo {
            email: ACCOUNT_EMAIL.to_string(),
            display_name: Some("Service Account".to_string()),
        })
    }

    async fn find_object(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<Option<ObjectRef>, StorageError> {
        let inner = self.inner.lock().unwrap();
        match parent {
            None => Ok(inner
                .containers
                .iter()
                .find(|(container_name, _)| container_name == name)
                .map(|(container_name, id)| ObjectRef {
                    id: id.clone(),
                    name: container_name.clone(),
                    modified_time: None,
                })),
            Some(parent_id) => Ok(inner
                .objects
                .iter()
                .find(|o| o.name == name && o.parent == parent_id)
                .map(|o| ObjectRef {
                    id: o.id.clone(),
                    name: o.name.clone(),
                    modified_time: Some(o.modified),
                })),
        }
    }

    async fn create_container(&self, name: &str) -> Result<String, StorageError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id("container");
        inner.containers.push((name.to_string(), id.clone()));
        Ok(id)
    }

    async fn create_object(
        &self,
        name: &str,
        parent: &str,
        content: &[u8],
    ) -> Result<ObjectRef, StorageError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id("object");
        let modified = inner.next_time();
        inner.objects.push(StoredObject {
            id: id.clone(),
            name: name.to_string(),
            parent: parent.to_string(),
            content: content.to_vec(),
            modified,
        });
        Ok(ObjectRef {
            id,
            name: name.to_string(),
            modified_time: Some(modified),
        })
    }

    async fn read_object(
        &self,
        object_id: &str,
    ) -> Result<(Vec<u8>, DateTime<Utc>), StorageError> {
        let inner = self.inner.lock().unwrap();
        inner
            .objects
            .iter()
            .find(|o| o.id == object_id)
            .map(|o| (o.content.clone(), o.modified))
            .ok_or_else(|| StorageError::NotFound(format!("object '{object_id}'")))
    }

    async fn write_object(
        &self,
        object_id: &str,
        content: &[u8],
    ) -> Result<DateTime<Utc>, StorageError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(StorageError::Transient("injected write failure".to_string()));
        }
        let modified = inner.next_time();
        let object = inner
            .objects
            .iter_mut()
            .find(|o| o.id == object_id)
            .ok_or_else(|| StorageError::NotFound(format!("object '{object_id}'")))?;
        object.content = content.to_vec();
        object.modified = modified;
        Ok(modified)
    }
}

/// Delegates to a shared [`MemoryBlobStore`], but when armed it performs a
/// competing same-name create right before the caller's own create runs --
/// landing exactly between the caller's existence check and its create, the
/// way a racing process would.
pub struct ContendingBlobStore {
    inner: MemoryBlobStore,
    contend_container: AtomicBool,
    contend_object: AtomicBool,
}

impl ContendingBlobStore {
    pub fn new(inner: MemoryBlobStore) -> Self {
        Self {
            inner,
            contend_container: AtomicBool::new(false),
            contend_object: AtomicBool::new(false),
        }
    }

    /// Inject one competing container creation on the next `create_container`.
    pub fn arm_container_race(&self) {
        self.contend_container.store(true, Ordering::SeqCst);
    }

    /// Inject one competing document creation on the next `create_object`.
    pub fn arm_object_race(&self) {
        self.contend_object.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for ContendingBlobStore {
    async fn about(&self) -> Result<AccountInfo, StorageError> {
        self.inner.about().await
    }

    async fn find_object(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<Option<ObjectRef>, StorageError> {
        self.inner.find_object(name, parent).await
    }

    async fn create_container(&self, name: &str) -> Result<String, StorageError> {
        if self.contend_container.swap(false, Ordering::SeqCst) {
            self.inner.create_container(name).await?;
        }
        self.inner.create_container(name).await
    }

    async fn create_object(
        &self,
        name: &str,
        parent: &str,
        content: &[u8],
    ) -> Result<ObjectRef, StorageError> {
        if self.contend_object.swap(false, Ordering::SeqCst) {
            self.inner.create_object(name, parent, b"").await?;
        }
        self.inner.create_object(name, parent, content).await
    }

    async fn read_object(
        &self,
        object_id: &str,
    ) -> Result<(Vec<u8>, DateTime<Utc>), StorageError> {
        self.inner.read_object(object_id).await
    }

    async fn write_object(
        &self,
        object_id: &str,
        content: &[u8],
    ) -> Result<DateTime<Utc>, StorageError> {
        self.inner.write_object(object_id, content).await
    }
}
