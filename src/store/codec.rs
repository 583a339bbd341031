//! Serialization of the logical database to and from the remote object's
//! byte payload.
//!
//! A zero-length (or whitespace-only) payload decodes to an empty database
//! so a freshly created remote object is a valid starting state. Any other
//! malformed payload is `CorruptDocument` and is never silently reset.

use serde_json::Value;

use crate::core::models::Database;
use crate::errors::StorageError;

pub fn encode(db: &Database) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec_pretty(db).map_err(|e| StorageError::Serialize(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<Database, StorageError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Database::default());
    }

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| StorageError::CorruptDocument(format!("invalid JSON: {e}")))?;

    let Value::Object(collections) = value else {
        return Err(StorageError::CorruptDocument(
            "top level must be an object of collections".to_string(),
        ));
    };

    for (name, records) in &collections {
        if !records.is_object() {
            return Err(StorageError::CorruptDocument(format!(
                "collection '{name}' must be an object of records"
            )));
        }
    }

    Ok(Database::from_collections(collections))
}
