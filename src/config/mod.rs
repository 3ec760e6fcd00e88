//! # Migrator Configuration
//!
//! Connection settings for the relational store and the object store, plus
//! the tuning knobs of the migration run itself.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use image_migrator::config::MigratorConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MigratorConfig::from_env()?;
//! let page_size = config.migration.batch_size;
//! let slots = config.migration.max_concurrency;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnectOptions;

pub use error::{ConfigResult, ConfigurationError};

/// Rows fetched per page
pub const DEFAULT_BATCH_SIZE: u32 = 1000;
/// Concurrent record pipelines
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_OUTPUT_DIR: &str = "./images";
pub const DEFAULT_KEY_PREFIX: &str = "mybl-tests/";
pub const DEFAULT_CONTENT_TYPE: &str = "image/png";
pub const DEFAULT_OBJECT_ACL: &str = "public-read";

/// Root configuration for a migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigratorConfig {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub migration: MigrationConfig,
}

impl MigratorConfig {
    /// Load from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        loader::load(None)
    }

    /// Load from an explicit key/value map instead of the process environment
    pub fn from_vars<I, K, V>(vars: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        loader::load(Some(vars))
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> ConfigResult<()> {
        if self.migration.batch_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "MIGRATION_BATCH_SIZE",
                "0",
                "page size must be at least 1",
            ));
        }
        if self.migration.max_concurrency == 0 {
            return Err(ConfigurationError::invalid_value(
                "MIGRATION_MAX_CONCURRENCY",
                "0",
                "at least one worker slot is required",
            ));
        }
        if self.migration.start_after_id < 0 {
            return Err(ConfigurationError::invalid_value(
                "MIGRATION_START_AFTER_ID",
                self.migration.start_after_id.to_string(),
                "watermark cannot be negative",
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "DB_MAX_CONNECTIONS",
                "0",
                "connection pool needs at least one connection",
            ));
        }
        if self.storage.bucket.contains('/') {
            return Err(ConfigurationError::invalid_value(
                "AWS_BUCKET",
                self.storage.bucket.clone(),
                "bucket names cannot contain '/'",
            ));
        }
        Ok(())
    }

    /// Configuration as JSON with secrets masked, safe for log output
    pub fn sanitized(&self) -> serde_json::Value {
        loader::sanitize_config_for_logging(self)
    }
}

/// MySQL connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database)
    }
}

/// S3-compatible object storage parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub use_path_style_endpoint: bool,
    /// Overrides the address written back to records
    pub public_base_url: Option<String>,
}

impl StorageConfig {
    /// Externally resolvable address of an object key
    ///
    /// A configured endpoint without a scheme is addressed over https.
    pub fn object_address(&self, key: &str) -> String {
        if let Some(base) = &self.public_base_url {
            return format!("{}/{key}", base.trim_end_matches('/'));
        }

        match &self.endpoint {
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/');
                if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                    format!("{endpoint}/{}/{key}", self.bucket)
                } else {
                    format!("https://{endpoint}/{}/{key}", self.bucket)
                }
            }
            None if self.use_path_style_endpoint => {
                format!("https://s3.{}.amazonaws.com/{}/{key}", self.region, self.bucket)
            }
            None => format!("https://{}.s3.{}.amazonaws.com/{key}", self.bucket, self.region),
        }
    }

    /// Endpoint URL for the S3 client, with a scheme
    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint.as_ref().map(|endpoint| {
            if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                endpoint.clone()
            } else {
                format!("https://{endpoint}")
            }
        })
    }
}

/// Tuning of the migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Rows requested per page
    pub batch_size: u32,
    /// Worker pool capacity
    pub max_concurrency: usize,
    /// Initial watermark, exclusive
    pub start_after_id: i64,
    pub output_dir: PathBuf,
    pub key_prefix: String,
    pub content_type: String,
    /// Canned ACL sent with uploads; `None` sends no ACL header
    pub object_acl: Option<String>,
}

impl MigrationConfig {
    /// Object key for a record
    pub fn storage_key(&self, record_id: i64) -> String {
        format!("{}{}", self.key_prefix, image_file_name(record_id))
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            start_after_id: 0,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            object_acl: Some(DEFAULT_OBJECT_ACL.to_string()),
        }
    }
}

/// File name shared by local copies and object keys
pub fn image_file_name(record_id: i64) -> String {
    format!("user_{record_id}.png")
}

pub fn local_image_path(output_dir: &Path, record_id: i64) -> PathBuf {
    output_dir.join(image_file_name(record_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(endpoint: Option<&str>, path_style: bool) -> StorageConfig {
        StorageConfig {
            bucket: "avatars".to_string(),
            endpoint: endpoint.map(str::to_string),
            region: "eu-west-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            use_path_style_endpoint: path_style,
            public_base_url: None,
        }
    }

    #[test]
    fn test_object_address_with_bare_endpoint() {
        let config = storage(Some("minio.local:9000"), true);
        assert_eq!(
            config.object_address("mybl-tests/user_5.png"),
            "https://minio.local:9000/avatars/mybl-tests/user_5.png"
        );
        assert_eq!(
            config.endpoint_url().as_deref(),
            Some("https://minio.local:9000")
        );
    }

    #[test]
    fn test_object_address_with_schemed_endpoint() {
        let config = storage(Some("http://localhost:9000/"), true);
        assert_eq!(
            config.object_address("k.png"),
            "http://localhost:9000/avatars/k.png"
        );
    }

    #[test]
    fn test_object_address_for_aws() {
        assert_eq!(
            storage(None, false).object_address("k.png"),
            "https://avatars.s3.eu-west-1.amazonaws.com/k.png"
        );
        assert_eq!(
            storage(None, true).object_address("k.png"),
            "https://s3.eu-west-1.amazonaws.com/avatars/k.png"
        );
    }

    #[test]
    fn test_public_base_url_wins() {
        let mut config = storage(Some("minio.local"), true);
        config.public_base_url = Some("https://cdn.example.com/".to_string());
        assert_eq!(
            config.object_address("mybl-tests/user_1.png"),
            "https://cdn.example.com/mybl-tests/user_1.png"
        );
    }

    #[test]
    fn test_storage_key_and_local_image_path() {
        let config = MigrationConfig::default();
        assert_eq!(config.storage_key(42), "mybl-tests/user_42.png");
        assert_eq!(
            local_image_path(&config.output_dir, 42),
            PathBuf::from("./images").join("user_42.png")
        );
    }
}
