//! Object storage uploads.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ClientOptions, ObjectStore, PutOptions, PutPayload};
use tracing::debug;

use crate::config::{ConfigurationError, MigrationConfig, StorageConfig};
use crate::error::{MigrationError, StepError, StepResult};

const ACL_HEADER: &str = "x-amz-acl";

/// Uploads raw bytes under a key and reports where they can be fetched
#[async_trait]
pub trait RemoteSink: Send + Sync + 'static {
    /// Upload `bytes` under `key`, returning the externally resolvable address
    async fn put(&self, key: &str, bytes: Bytes) -> StepResult<String>;
}

/// [`RemoteSink`] backed by any [`ObjectStore`], normally S3
pub struct ObjectStoreRemoteSink {
    store: Arc<dyn ObjectStore>,
    storage: StorageConfig,
    content_type: String,
}

impl std::fmt::Debug for ObjectStoreRemoteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreRemoteSink")
            .field("store", &self.store.to_string())
            .field("bucket", &self.storage.bucket)
            .field("content_type", &self.content_type)
            .finish()
    }
}

impl ObjectStoreRemoteSink {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        storage: StorageConfig,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            store,
            storage,
            content_type: content_type.into(),
        }
    }

    /// Build an S3 client from configuration
    ///
    /// Content type and ACL are fixed for the whole run. The ACL travels as a
    /// default request header because the store API has no per-put ACL.
    pub fn from_config(
        storage: &StorageConfig,
        migration: &MigrationConfig,
    ) -> Result<Self, MigrationError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&storage.bucket)
            .with_region(&storage.region)
            .with_client_options(client_options(migration.object_acl.as_deref())?);

        if let Some(endpoint) = storage.endpoint_url() {
            let allow_http = endpoint.starts_with("http://");
            let endpoint = if storage.use_path_style_endpoint {
                endpoint
            } else {
                virtual_hosted_endpoint(&endpoint, &storage.bucket)
            };
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(allow_http)
                .with_virtual_hosted_style_request(!storage.use_path_style_endpoint);
        }

        if let (Some(key_id), Some(secret)) = (&storage.access_key_id, &storage.secret_access_key)
        {
            builder = builder
                .with_access_key_id(key_id)
                .with_secret_access_key(secret);
        }

        let store = builder.build()?;

        debug!(
            bucket = %storage.bucket,
            region = %storage.region,
            endpoint = ?storage.endpoint,
            path_style = storage.use_path_style_endpoint,
            "Object store client created"
        );

        Ok(Self::new(
            Arc::new(store),
            storage.clone(),
            migration.content_type.clone(),
        ))
    }
}

fn client_options(acl: Option<&str>) -> Result<ClientOptions, ConfigurationError> {
    let Some(acl) = acl else {
        return Ok(ClientOptions::new());
    };

    let value = HeaderValue::from_str(acl).map_err(|e| {
        ConfigurationError::invalid_value("MIGRATION_OBJECT_ACL", acl, e.to_string())
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(ACL_HEADER), value);

    Ok(ClientOptions::new().with_default_headers(headers))
}

/// `https://host:9000` becomes `https://bucket.host:9000`
fn virtual_hosted_endpoint(endpoint: &str, bucket: &str) -> String {
    match endpoint.split_once("://") {
        Some((scheme, host)) => format!("{scheme}://{bucket}.{host}"),
        None => format!("{bucket}.{endpoint}"),
    }
}

#[async_trait]
impl RemoteSink for ObjectStoreRemoteSink {
    async fn put(&self, key: &str, bytes: Bytes) -> StepResult<String> {
        let location = Path::parse(key).map_err(|e| StepError::Upload {
            key: key.to_string(),
            source: e.into(),
        })?;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, self.content_type.clone().into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&location, PutPayload::from_bytes(bytes), options)
            .await
            .map_err(|source| StepError::Upload {
                key: key.to_string(),
                source,
            })?;

        Ok(self.storage.object_address(key))
    }
}
