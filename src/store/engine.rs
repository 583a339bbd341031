//! The document store engine.
//!
//! Owns the in-memory copy of the logical database and mediates every read
//! and write against the blob store. The remote medium offers whole-object
//! read/write only, so "atomicity" is whole-document read-modify-write
//! guarded by a single in-process mutex plus a modification-timestamp
//! staleness check (optimistic concurrency).
//!
//! # Concurrency
//!
//! Within one process, the mutex serializes every encode-write-commit
//! sequence and every cache refresh. Across processes there is no lock: an
//! external write is detected by comparing the remote object's
//! `modifiedTime` against the last-known watermark before trusting the
//! cache. Two processes racing past each other's staleness probes resolve
//! last-writer-wins at whole-document granularity; that boundary is accepted
//! for the expected write volume (bootstrap, occasional account creation).

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clients::BlobStore;
use crate::core::models::{Database, DocumentHandle, Entity};
use crate::errors::StorageError;
use crate::store::codec;

#[derive(Default)]
struct State {
    handle: Option<DocumentHandle>,
    db: Database,
}

/// Document store over a [`BlobStore`], multiplexing typed record
/// collections into one remote object.
///
/// Construct one per process at startup and share it; the engine carries the
/// cached document and the write lock, so a second instance against the same
/// document would only widen the race window.
pub struct DocumentStore<B: BlobStore> {
    blob: B,
    container_name: String,
    document_name: String,
    state: Mutex<State>,
}

impl<B: BlobStore> DocumentStore<B> {
    pub fn new(blob: B, container_name: &str, document_name: &str) -> Self {
        Self {
            blob,
            container_name: container_name.to_string(),
            document_name: document_name.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn blob(&self) -> &B {
        &self.blob
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    /// Locate or create the backing container and document, and prime the
    /// cache from it. Idempotent; safe to run repeatedly and from multiple
    /// processes.
    pub async fn ensure_document(&self) -> Result<DocumentHandle, StorageError> {
        let mut state = self.state.lock().await;
        self.ensure_document_locked(&mut state).await
    }

    /// Fetch a record by id.
    pub async fn get<E: Entity>(&self, id: &str) -> Result<Option<E>, StorageError> {
        let mut state = self.state.lock().await;
        self.validate_cache(&mut state, false).await?;
        let Some(records) = state.db.collection(E::COLLECTION) else {
            return Ok(None);
        };
        records.get(id).map(decode_record::<E>).transpose()
    }

    /// Scan a collection for the record whose unique `field` equals `value`.
    /// The create-side uniqueness check guarantees at most one match.
    pub async fn find_by_unique_key<E: Entity>(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Option<E>, StorageError> {
        let mut state = self.state.lock().await;
        self.validate_cache(&mut state, false).await?;
        let Some(records) = state.db.collection(E::COLLECTION) else {
            return Ok(None);
        };
        for record in records.values() {
            if record.get(field).and_then(Value::as_str) == Some(value) {
                return Ok(Some(decode_record(record)?));
            }
        }
        Ok(None)
    }

    pub async fn exists<E: Entity>(
        &self,
        field: &str,
        value: &str,
    ) -> Result<bool, StorageError> {
        Ok(self.find_by_unique_key::<E>(field, value).await?.is_some())
    }

    /// Snapshot of a collection in insertion order.
    pub async fn list<E: Entity>(&self) -> Result<Vec<E>, StorageError> {
        let mut state = self.state.lock().await;
        self.validate_cache(&mut state, false).await?;
        let Some(records) = state.db.collection(E::COLLECTION) else {
            return Ok(Vec::new());
        };
        records.values().map(decode_record).collect()
    }

    /// Insert a new record. Fails `Conflict` on an id collision or a
    /// collision on the entity's unique field, leaving the store unchanged.
    pub async fn create<E: Entity>(&self, record: &E) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        self.validate_cache(&mut state, true).await?;

        let id = record.id().to_string();
        let value = serde_json::to_value(record)?;

        if let Some(records) = state.db.collection(E::COLLECTION) {
            if records.contains_key(&id) {
                return Err(StorageError::Conflict(format!(
                    "record '{id}' already exists in '{}'",
                    E::COLLECTION
                )));
            }
            if let Some(field) = E::UNIQUE_FIELD {
                if let Some(new_unique) = value.get(field) {
                    if records.values().any(|r| r.get(field) == Some(new_unique)) {
                        return Err(StorageError::Conflict(format!(
                            "value of unique field '{field}' already taken in '{}'",
                            E::COLLECTION
                        )));
                    }
                }
            }
        }

        debug!(collection = E::COLLECTION, id = %id, "creating record");
        let mut scratch = state.db.clone();
        scratch.collection_mut(E::COLLECTION).insert(id, value);
        self.write_back(&mut state, scratch).await
    }

    /// Replace a record wholesale. Fails `NotFound` when `id` is absent and
    /// `Conflict` when the replacement carries a different id or steals
    /// another record's unique-field value.
    pub async fn update<E: Entity>(&self, id: &str, record: &E) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        self.validate_cache(&mut state, true).await?;

        if record.id() != id {
            return Err(StorageError::Conflict(format!(
                "record id is immutable: replacement for '{id}' carries id '{}'",
                record.id()
            )));
        }
        let value = serde_json::to_value(record)?;

        let Some(records) = state.db.collection(E::COLLECTION) else {
            return Err(StorageError::NotFound(format!(
                "no record '{id}' in '{}'",
                E::COLLECTION
            )));
        };
        if !records.contains_key(id) {
            return Err(StorageError::NotFound(format!(
                "no record '{id}' in '{}'",
                E::COLLECTION
            )));
        }
        if let Some(field) = E::UNIQUE_FIELD {
            if let Some(new_unique) = value.get(field) {
                if records
                    .iter()
                    .any(|(other, r)| other != id && r.get(field) == Some(new_unique))
                {
                    return Err(StorageError::Conflict(format!(
                        "value of unique field '{field}' already taken in '{}'",
                        E::COLLECTION
                    )));
                }
            }
        }

        debug!(collection = E::COLLECTION, id, "updating record");
        let mut scratch = state.db.clone();
        scratch
            .collection_mut(E::COLLECTION)
            .insert(id.to_string(), value);
        self.write_back(&mut state, scratch).await
    }

    async fn ensure_document_locked(
        &self,
        state: &mut State,
    ) -> Result<DocumentHandle, StorageError> {
        if let Some(handle) = &state.handle {
            return Ok(handle.clone());
        }

        let container_id = match self.blob.find_object(&self.container_name, None).await? {
            Some(container) => container.id,
            None => {
                info!(container = %self.container_name, "storage container absent, creating");
                let created = self.blob.create_container(&self.container_name).await?;
                // A concurrent process may have created the container between
                // the existence check and our create. Re-query and adopt the
                // container the listing reports first, the same way the
                // document path below does, so every process converges on
                // one container.
                self.blob
                    .find_object(&self.container_name, None)
                    .await?
                    .map(|container| container.id)
                    .unwrap_or(created)
            }
        };

        let object = match self
            .blob
            .find_object(&self.document_name, Some(&container_id))
            .await?
        {
            Some(object) => object,
            None => {
                info!(document = %self.document_name, "document absent, creating empty");
                let empty = codec::encode(&Database::default())?;
                let created = self
                    .blob
                    .create_object(&self.document_name, &container_id, &empty)
                    .await?;
                // A concurrent process may have created the document between
                // the existence check and our create. Re-query and adopt
                // whichever object the listing reports; we do not assume we
                // are the creator.
                self.blob
                    .find_object(&self.document_name, Some(&container_id))
                    .await?
                    .unwrap_or(created)
            }
        };

        let (bytes, modified_time) = self.blob.read_object(&object.id).await?;
        state.db = codec::decode(&bytes)?;
        let handle = DocumentHandle {
            object_id: object.id,
            container_id,
            modified_time,
        };
        state.handle = Some(handle.clone());
        Ok(handle)
    }

    /// Trust the cache only while its watermark matches the remote object's
    /// current `modifiedTime`; refetch and decode on mismatch.
    ///
    /// When the listing no longer reports the document at all, reads keep
    /// serving the last-validated cache (listing lag is routine), but
    /// mutations fail `NotFound` rather than write back to an object id
    /// nobody else can locate.
    async fn validate_cache(
        &self,
        state: &mut State,
        for_write: bool,
    ) -> Result<(), StorageError> {
        let Some(handle) = state.handle.clone() else {
            self.ensure_document_locked(state).await?;
            return Ok(());
        };

        let listed = self
            .blob
            .find_object(&self.document_name, Some(&handle.container_id))
            .await?;

        match listed {
            Some(object) if object.modified_time == Some(handle.modified_time) => Ok(()),
            Some(object) => {
                debug!(
                    object_id = %object.id,
                    "remote document changed, refreshing cache"
                );
                let (bytes, modified_time) = self.blob.read_object(&object.id).await?;
                state.db = codec::decode(&bytes)?;
                state.handle = Some(DocumentHandle {
                    object_id: object.id,
                    container_id: handle.container_id,
                    modified_time,
                });
                Ok(())
            }
            None => {
                if for_write {
                    return Err(StorageError::NotFound(format!(
                        "document '{}' is no longer listed in its container",
                        self.document_name
                    )));
                }
                // Listing lag on the remote side; keep the last-validated
                // cache rather than failing reads.
                warn!(
                    document = %self.document_name,
                    "document missing from listing, serving last-validated cache"
                );
                Ok(())
            }
        }
    }

    /// Encode and persist `scratch`, committing it to the cache only after a
    /// durable write. On failure the pre-mutation state is kept so the cache
    /// never diverges from what was last written.
    async fn write_back(&self, state: &mut State, scratch: Database) -> Result<(), StorageError> {
        let Some(handle) = state.handle.as_mut() else {
            return Err(StorageError::Persistence(
                "document handle missing before write-back".to_string(),
            ));
        };

        let bytes = codec::encode(&scratch)?;
        match self.blob.write_object(&handle.object_id, &bytes).await {
            Ok(modified_time) => {
                state.db = scratch;
                handle.modified_time = modified_time;
                Ok(())
            }
            // The client already retried with backoff; a transient error
            // surfacing here means retries are exhausted.
            Err(StorageError::Transient(msg)) => Err(StorageError::Persistence(msg)),
            Err(e) => Err(e),
        }
    }
}

fn decode_record<E: Entity>(value: &Value) -> Result<E, StorageError> {
    serde_json::from_value(value.clone()).map_err(|e| {
        StorageError::CorruptDocument(format!(
            "record in '{}' does not match its kind: {e}",
            E::COLLECTION
        ))
    })
}
