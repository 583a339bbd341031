// Bootstrap entry point: connect to the blob store, locate or create the
// storage container and database document, and ensure the default admin
// account exists. Safe to run on every deployment.

use std::process::ExitCode;

use drivedb::clients::DriveClient;
use drivedb::core::config::AppConfig;
use drivedb::errors::StorageError;
use drivedb::setup::run_setup;
use drivedb::store::DocumentStore;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("Starting storage setup...\n");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let client = match DriveClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Client error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let store = DocumentStore::new(client, &config.container_name, &config.document_name);

    match run_setup(&store, &config).await {
        Ok(summary) => {
            println!("Setup completed successfully.\n");
            println!("Summary:");
            println!("  - Account:        {}", summary.account_email);
            println!("  - Container:      {}", summary.container_name);
            println!("  - Database file:  {}", summary.document_name);
            println!("  - Admin account:  {}", summary.admin_email);
            if summary.admin_created {
                println!("  - Default admin account was created");
            } else {
                println!("  - Admin account already existed");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("\nError during setup:");
            eprintln!("  {e}\n");

            if let StorageError::Connection(_) = e {
                eprintln!("Tip: the storage account session is not authorized.");
                eprintln!("  1. Check that DRIVE_ACCESS_TOKEN is set and not expired");
                eprintln!("  2. Re-authorize the Drive integration for this account");
                eprintln!("  3. Re-run this setup; completed steps are skipped");
            }

            ExitCode::FAILURE
        }
    }
}
