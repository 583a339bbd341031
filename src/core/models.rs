//! Domain model for the document store.
//!
//! The whole logical database lives in one remote object. [`Database`] is the
//! in-memory value decoded from it: a map of collection name to a map of
//! record id to record payload. Typed access goes through the [`Entity`]
//! trait, which names a record kind's collection and its unique field.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// The logical database: named collections of records multiplexed into one
/// document. Insertion order of collections and records is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Database {
    collections: Map<String, Value>,
}

impl Database {
    pub fn from_collections(collections: Map<String, Value>) -> Self {
        Self { collections }
    }

    pub fn collections(&self) -> &Map<String, Value> {
        &self.collections
    }

    /// Records of a collection, or `None` if the collection has never been
    /// written to.
    pub fn collection(&self, name: &str) -> Option<&Map<String, Value>> {
        self.collections.get(name).and_then(Value::as_object)
    }

    /// Mutable records of a collection, created empty on first use.
    pub fn collection_mut(&mut self, name: &str) -> &mut Map<String, Value> {
        let entry = self
            .collections
            .entry(name.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        entry.as_object_mut().unwrap()
    }

    pub fn is_empty(&self) -> bool {
        self.collections
            .values()
            .all(|c| c.as_object().is_none_or(|records| records.is_empty()))
    }
}

/// Where the logical database is persisted and the last observed version
/// marker. The cache is only trusted while `modified_time` matches the
/// remote object's current modification timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentHandle {
    pub object_id: String,
    pub container_id: String,
    pub modified_time: DateTime<Utc>,
}

/// A record kind stored in one collection of the database.
///
/// `UNIQUE_FIELD` names a field that carries at most one record per value
/// within the collection; `create` enforces it.
pub trait Entity: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;
    const UNIQUE_FIELD: Option<&'static str> = None;

    /// Stable record id, immutable after creation.
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminAccount {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

impl AdminAccount {
    pub fn new(email: &str, username: &str, password: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: hash_password(password),
        }
    }
}

impl Entity for AdminAccount {
    const COLLECTION: &'static str = "admins";
    const UNIQUE_FIELD: Option<&'static str> = Some("email");

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

impl UserAccount {
    pub fn new(email: &str, username: &str, password: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: hash_password(password),
        }
    }
}

impl Entity for UserAccount {
    const COLLECTION: &'static str = "users";
    const UNIQUE_FIELD: Option<&'static str> = Some("email");

    fn id(&self) -> &str {
        &self.id
    }
}

/// Hash a plaintext credential for storage as `salt$hexdigest`.
///
/// Plaintext is never stored or compared directly; verification re-hashes
/// with the stored salt.
pub fn hash_password(plaintext: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{salt}${}", digest_with_salt(&salt, plaintext))
}

pub fn verify_password(plaintext: &str, stored: &str) -> bool {
    let Some((salt, digest)) = stored.split_once('$') else {
        return false;
    };
    digest_with_salt(salt, plaintext) == digest
}

fn digest_with_salt(salt: &str, plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(plaintext.as_bytes());
    hex::encode(hasher.finalize())
}
