/// drivedb - a document store backed by a single file on a cloud file host.
///
/// One remote object (Google Drive in the shipped adapter) holds the whole
/// logical database: a JSON document of named record collections. The store
/// exposes database-like guarantees on top of whole-file read/write:
/// existence checks, conflict-checked record creation, lookup by unique
/// key, serialized write-backs, and staleness detection against the remote
/// object's modification timestamp.
///
/// # Architecture
///
/// - `clients` - the `BlobStore` capability trait and the Drive v3 client
/// - `store` - the document codec and the `DocumentStore` engine
/// - `setup` - the idempotent bootstrap routine (`drivedb-setup` binary)
/// - Tokio for the async runtime; every remote call is a suspension point
///
/// # Example
///
/// ```no_run
/// use drivedb::clients::DriveClient;
/// use drivedb::core::config::AppConfig;
/// use drivedb::core::models::AdminAccount;
/// use drivedb::store::DocumentStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     drivedb::setup_logging();
///
///     let config = AppConfig::from_env()?;
///     let client = DriveClient::new(&config)?;
///     let store = DocumentStore::new(client, &config.container_name, &config.document_name);
///
///     store.ensure_document().await?;
///     if let Some(admin) = store
///         .find_by_unique_key::<AdminAccount>("email", &config.default_admin_email)
///         .await?
///     {
///         println!("admin record: {}", admin.id);
///     }
///
///     Ok(())
/// }
/// ```
// Module declarations
pub mod clients;
pub mod core;
pub mod errors;
pub mod setup;
pub mod store;

/// Configure structured logging with JSON format.
///
/// Sets up tracing-subscriber with a JSON formatter suitable for log
/// aggregation. Call once at process start.
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    tracing_subscriber::registry().with(fmt_layer).init();
}
