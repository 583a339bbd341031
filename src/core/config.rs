use std::env;

pub const DEFAULT_CONTAINER_NAME: &str = "AppStorage";
pub const DEFAULT_DOCUMENT_NAME: &str = "database.json";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub drive_access_token: String,
    pub drive_api_base: String,
    pub drive_upload_base: String,
    pub container_name: String,
    pub document_name: String,
    pub default_admin_email: String,
    pub default_admin_username: String,
    pub default_admin_password: String,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            drive_access_token: env::var("DRIVE_ACCESS_TOKEN")
                .map_err(|e| format!("DRIVE_ACCESS_TOKEN: {}", e))?,
            drive_api_base: env::var("DRIVE_API_BASE")
                .unwrap_or_else(|_| "https://www.googleapis.com/drive/v3".to_string()),
            drive_upload_base: env::var("DRIVE_UPLOAD_BASE")
                .unwrap_or_else(|_| "https://www.googleapis.com/upload/drive/v3".to_string()),
            container_name: env::var("STORAGE_CONTAINER_NAME")
                .unwrap_or_else(|_| DEFAULT_CONTAINER_NAME.to_string()),
            document_name: env::var("DATABASE_FILE_NAME")
                .unwrap_or_else(|_| DEFAULT_DOCUMENT_NAME.to_string()),
            default_admin_email: env::var("DEFAULT_ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@example.com".to_string()),
            default_admin_username: env::var("DEFAULT_ADMIN_USERNAME")
                .unwrap_or_else(|_| "admin".to_string()),
            default_admin_password: env::var("DEFAULT_ADMIN_PASSWORD")
                .unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        })
    }
}
