//! Idempotent first-run setup: verify the blob store session, locate or
//! create the backing document, ensure the default admin account exists.
//!
//! Every step is independently idempotent, so the routine is safe to run on
//! every deployment and from multiple processes; re-running after a failure
//! completes the remaining steps only.

use serde::Serialize;
use tracing::{info, warn};

use crate::clients::BlobStore;
use crate::core::config::{AppConfig, DEFAULT_ADMIN_PASSWORD};
use crate::core::models::AdminAccount;
use crate::errors::StorageError;
use crate::store::DocumentStore;

/// Structured outcome of a setup run.
#[derive(Debug, Clone, Serialize)]
pub struct SetupSummary {
    pub account_email: String,
    pub container_name: String,
    pub document_name: String,
    pub admin_email: String,
    pub admin_created: bool,
}

/// Run the bootstrap sequence against `store`.
///
/// # Errors
///
/// Returns `Connection` when the blob store session is not authorized, and
/// propagates any store or codec failure from the later steps unchanged.
pub async fn run_setup<B: BlobStore>(
    store: &DocumentStore<B>,
    config: &AppConfig,
) -> Result<SetupSummary, StorageError> {
    let account = store.blob().about().await?;
    info!(account = %account.email, "connected to blob store");

    let handle = store.ensure_document().await?;
    info!(
        container_id = %handle.container_id,
        object_id = %handle.object_id,
        "storage document ready"
    );

    let admin_email = config.default_admin_email.as_str();
    let admin_created = if store
        .exists::<AdminAccount>("email", admin_email)
        .await?
    {
        info!(email = admin_email, "admin account already exists");
        false
    } else {
        if config.default_admin_password == DEFAULT_ADMIN_PASSWORD {
            warn!("default admin password in use; set DEFAULT_ADMIN_PASSWORD and rotate it");
        }
        let admin = AdminAccount::new(
            admin_email,
            &config.default_admin_username,
            &config.default_admin_password,
        );
        match store.create(&admin).await {
            Ok(()) => {
                info!(email = admin_email, "default admin account created");
                true
            }
            // Another process created the admin between our existence check
            // and the write; that still satisfies this step.
            Err(StorageError::Conflict(_)) => {
                info!(email = admin_email, "admin account created concurrently");
                false
            }
            Err(e) => return Err(e),
        }
    };

    Ok(SetupSummary {
        account_email: account.email,
        container_name: store.container_name().to_string(),
        document_name: store.document_name().to_string(),
        admin_email: admin_email.to_string(),
        admin_created,
    })
}
