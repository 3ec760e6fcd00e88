//! Configuration Loader
//!
//! Reads the environment-style key/value settings (`DB_*`, `AWS_*`,
//! `MIGRATION_*`) through the `config` crate and assembles a validated
//! [`MigratorConfig`].

use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use super::error::{ConfigResult, ConfigurationError};
use super::{
    DatabaseConfig, MigrationConfig, MigratorConfig, StorageConfig, DEFAULT_BATCH_SIZE,
    DEFAULT_CONTENT_TYPE, DEFAULT_KEY_PREFIX, DEFAULT_MAX_CONCURRENCY, DEFAULT_OBJECT_ACL,
    DEFAULT_OUTPUT_DIR,
};

const DEFAULT_DB_HOST: &str = "127.0.0.1";
const DEFAULT_DB_PORT: u16 = 3306;
const DEFAULT_REGION: &str = "us-east-1";

/// Flat view of the recognized keys. The `config` crate lowercases
/// environment keys, so `DB_HOST` arrives as `db_host`.
#[derive(Debug, Default, Deserialize)]
struct EnvSettings {
    db_host: Option<String>,
    db_port: Option<String>,
    db_username: Option<String>,
    db_password: Option<String>,
    db_database: Option<String>,
    db_max_connections: Option<String>,

    aws_bucket: Option<String>,
    aws_endpoint: Option<String>,
    aws_default_region: Option<String>,
    aws_access_key_id: Option<String>,
    aws_secret_access_key: Option<String>,
    aws_use_path_style_endpoint: Option<String>,

    migration_batch_size: Option<String>,
    migration_max_concurrency: Option<String>,
    migration_start_after_id: Option<String>,
    migration_output_dir: Option<String>,
    migration_key_prefix: Option<String>,
    migration_content_type: Option<String>,
    migration_object_acl: Option<String>,
    migration_public_base_url: Option<String>,
}

/// Load configuration from `vars`, or from the process environment when `None`
pub(super) fn load(vars: Option<config::Map<String, String>>) -> ConfigResult<MigratorConfig> {
    let settings: EnvSettings = config::Config::builder()
        .add_source(config::Environment::default().source(vars))
        .build()?
        .try_deserialize()?;

    let config = settings.into_config()?;
    config.validate()?;

    debug!(
        config = %sanitize_config_for_logging(&config),
        "Configuration loaded"
    );

    Ok(config)
}

impl EnvSettings {
    fn into_config(self) -> ConfigResult<MigratorConfig> {
        let migration = MigrationConfig {
            batch_size: parse_or("MIGRATION_BATCH_SIZE", self.migration_batch_size, DEFAULT_BATCH_SIZE)?,
            max_concurrency: parse_or(
                "MIGRATION_MAX_CONCURRENCY",
                self.migration_max_concurrency,
                DEFAULT_MAX_CONCURRENCY,
            )?,
            start_after_id: parse_or("MIGRATION_START_AFTER_ID", self.migration_start_after_id, 0)?,
            output_dir: PathBuf::from(
                non_empty(self.migration_output_dir).unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
            // An explicitly empty prefix is meaningful: keys land at the bucket root.
            key_prefix: self
                .migration_key_prefix
                .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            content_type: non_empty(self.migration_content_type)
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            object_acl: match self.migration_object_acl {
                None => Some(DEFAULT_OBJECT_ACL.to_string()),
                Some(acl) => non_empty(Some(acl)),
            },
        };

        let default_connections = u32::try_from(migration.max_concurrency.saturating_add(1))
            .unwrap_or(u32::MAX);

        let database = DatabaseConfig {
            host: non_empty(self.db_host).unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
            port: parse_or("DB_PORT", self.db_port, DEFAULT_DB_PORT)?,
            username: required("DB_USERNAME", self.db_username, "database configuration")?,
            password: self.db_password.unwrap_or_default(),
            database: required("DB_DATABASE", self.db_database, "database configuration")?,
            max_connections: parse_or(
                "DB_MAX_CONNECTIONS",
                self.db_max_connections,
                default_connections,
            )?,
        };

        let storage = StorageConfig {
            bucket: required("AWS_BUCKET", self.aws_bucket, "object storage configuration")?,
            endpoint: non_empty(self.aws_endpoint),
            region: non_empty(self.aws_default_region)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            access_key_id: non_empty(self.aws_access_key_id),
            secret_access_key: non_empty(self.aws_secret_access_key),
            use_path_style_endpoint: parse_flag(
                "AWS_USE_PATH_STYLE_ENDPOINT",
                self.aws_use_path_style_endpoint,
            )?,
            public_base_url: non_empty(self.migration_public_base_url),
        };

        Ok(MigratorConfig {
            database,
            storage,
            migration,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(field: &str, value: Option<String>, context: &str) -> ConfigResult<String> {
    non_empty(value).ok_or_else(|| ConfigurationError::missing_required_field(field, context))
}

fn parse_or<T>(field: &str, value: Option<String>, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(value) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigurationError::invalid_value(field, raw.clone(), e.to_string())),
    }
}

fn parse_flag(field: &str, value: Option<String>) -> ConfigResult<bool> {
    match non_empty(value) {
        None => Ok(false),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigurationError::invalid_value(
                field,
                raw,
                "expected true or false",
            )),
        },
    }
}

/// Mask sensitive fields before a configuration is logged
pub(super) fn sanitize_config_for_logging(config: &MigratorConfig) -> serde_json::Value {
    let mut config_json = serde_json::json!(config);
    let sensitive_patterns = ["password", "secret", "access_key", "token", "credential"];
    sanitize_json_recursive(&mut config_json, &sensitive_patterns);
    config_json
}

fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                let is_sensitive = sensitive_patterns
                    .iter()
                    .any(|pattern| key_lower.contains(pattern));

                if is_sensitive {
                    *val = match val {
                        serde_json::Value::Null => serde_json::Value::Null,
                        serde_json::Value::String(s) if s.is_empty() => {
                            serde_json::Value::String("[EMPTY]".to_string())
                        }
                        _ => serde_json::Value::String("[MASKED]".to_string()),
                    };
                } else {
                    sanitize_json_recursive(val, sensitive_patterns);
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                sanitize_json_recursive(item, sensitive_patterns);
            }
        }
        _ => {}
    }
}
