//! Paste storage on a blob/object service (S3, Azure Blob, in-memory).
//!
//! Each paste is one object named after its id. Metadata travels as the
//! object's user-defined attributes and is replaced by re-uploading the
//! content with a new attribute set.

mod provision;

use self::provision::{AzureProvisioner, ContainerProvisioner, Provisioned, S3Provisioner};
use crate::error::{wrap_native, StoreError, StoreResult};
use crate::filter::{finish_listing, matches};
use crate::runtime::BlockingRuntime;
use crate::store::{
    missing_metadata_value, require_metadata, validate_metadata_key, Metadata, PasteStore,
};
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, AttributeValue, Attributes, ClientOptions, GetOptions, ObjectStore, PutOptions,
    PutPayload, RetryConfig,
};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

/// Connection settings for an S3-compatible service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub region: Option<String>,
    /// Custom endpoint (MinIO and friends); plain http is allowed here.
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

/// Connection settings for Azure Blob Storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureSettings {
    pub account_name: String,
    pub account_key: String,
    pub container: String,
    /// Blob endpoint override, e.g. an Azurite emulator.
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

/// Which object service a store talks to; only affects error wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectService {
    S3,
    Azure,
    Memory,
}

impl ObjectService {
    fn error_message(self) -> &'static str {
        match self {
            Self::S3 => "Error while communicating with AWS S3",
            Self::Azure => "Error while communicating with Azure Storage",
            Self::Memory => "Error while communicating with the object store",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Azure => "azure",
            Self::Memory => "memory",
        }
    }
}

/// [`PasteStore`] over any [`ObjectStore`] implementation.
pub struct ObjectStorageStore {
    objects: Arc<dyn ObjectStore>,
    service: ObjectService,
    provisioner: Option<Box<dyn ContainerProvisioner>>,
    runtime: BlockingRuntime,
}

/// Retries stop once `timeout` has elapsed.
fn retry_config(timeout: Duration) -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        retry_timeout: timeout,
        ..Default::default()
    }
}

fn is_not_found(err: &object_store::Error) -> bool {
    matches!(err, object_store::Error::NotFound { .. })
}

fn to_attributes(metadata: &Metadata) -> Attributes {
    let mut attributes = Attributes::new();
    for (key, value) in metadata {
        attributes.insert(
            Attribute::Metadata(Cow::Owned(key.clone())),
            AttributeValue::from(value.clone()),
        );
    }
    attributes
}

fn from_attributes(attributes: &Attributes) -> Metadata {
    attributes
        .iter()
        .filter_map(|(attribute, value)| match attribute {
            Attribute::Metadata(key) => Some((key.to_string(), value.to_string())),
            _ => None,
        })
        .collect()
}

impl ObjectStorageStore {
    /// Wrap an existing object store client.
    ///
    /// # Errors
    /// Returns [`StoreError::Recoverable`] when the runtime cannot start.
    pub fn new(objects: Arc<dyn ObjectStore>, service: ObjectService) -> StoreResult<Self> {
        Ok(Self {
            objects,
            service,
            provisioner: None,
            runtime: BlockingRuntime::new(service.label())?,
        })
    }

    /// Create the bucket or container on [`PasteStore::initialize_backend`].
    pub(crate) fn with_provisioner(mut self, provisioner: Box<dyn ContainerProvisioner>) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    /// Store backed by process memory. Contents vanish with the process.
    ///
    /// # Errors
    /// Returns [`StoreError::Recoverable`] when the runtime cannot start.
    pub fn in_memory() -> StoreResult<Self> {
        Self::new(Arc::new(InMemory::new()), ObjectService::Memory)
    }

    /// Store on an S3 bucket, created on initialization if absent.
    ///
    /// # Errors
    /// Returns [`StoreError::Recoverable`] when the client cannot be built.
    pub fn s3(settings: &S3Settings) -> StoreResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_access_key_id(&settings.access_key_id)
            .with_secret_access_key(&settings.secret_access_key)
            .with_bucket_name(&settings.bucket)
            .with_client_options(ClientOptions::new().with_timeout(settings.timeout))
            .with_retry(retry_config(settings.timeout));
        if let Some(region) = &settings.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &settings.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        let objects = builder.build().map_err(wrap_native(
            "build s3 client",
            ObjectService::S3.error_message(),
        ))?;
        Ok(Self::new(Arc::new(objects), ObjectService::S3)?
            .with_provisioner(Box::new(S3Provisioner::new(settings))))
    }

    /// Store on an Azure Blob container, created on initialization if absent.
    ///
    /// # Errors
    /// Returns [`StoreError::Recoverable`] when the client cannot be built.
    pub fn azure(settings: &AzureSettings) -> StoreResult<Self> {
        let mut builder = MicrosoftAzureBuilder::new()
            .with_account(&settings.account_name)
            .with_access_key(&settings.account_key)
            .with_container_name(&settings.container)
            .with_client_options(ClientOptions::new().with_timeout(settings.timeout))
            .with_retry(retry_config(settings.timeout));
        if let Some(endpoint) = &settings.endpoint {
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(endpoint.starts_with("http://"));
        }
        let objects = builder.build().map_err(wrap_native(
            "build azure client",
            ObjectService::Azure.error_message(),
        ))?;
        Ok(Self::new(Arc::new(objects), ObjectService::Azure)?
            .with_provisioner(Box::new(AzureProvisioner::new(settings))))
    }

    pub fn service(&self) -> ObjectService {
        self.service
    }

    fn wrap(&self, context: &'static str) -> impl Fn(object_store::Error) -> StoreError {
        wrap_native(context, self.service.error_message())
    }

    async fn read_attributes(&self, location: &ObjectPath) -> object_store::Result<Metadata> {
        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        let result = self.objects.get_opts(location, options).await?;
        Ok(from_attributes(&result.attributes))
    }

    async fn read_content(&self, location: &ObjectPath) -> object_store::Result<Vec<u8>> {
        let bytes = self.objects.get(location).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn list_matching(
        &self,
        filters: &Metadata,
        fdefaults: &Metadata,
    ) -> object_store::Result<Vec<String>> {
        let objects: Vec<_> = self.objects.list(None).try_collect().await?;
        let mut ids = Vec::new();
        for object in objects {
            let keep = if filters.is_empty() {
                true
            } else {
                match self.read_attributes(&object.location).await {
                    Ok(metadata) => matches(&metadata, filters, fdefaults),
                    // Deleted between listing and lookup.
                    Err(err) if is_not_found(&err) => false,
                    Err(err) => return Err(err),
                }
            };
            if keep {
                ids.push(object.location.to_string());
            }
        }
        Ok(ids)
    }
}

impl PasteStore for ObjectStorageStore {
    fn initialize_backend(&self) -> StoreResult<()> {
        if let Some(provisioner) = &self.provisioner {
            let provisioned = self
                .runtime
                .block_on(provisioner.ensure())
                .map_err(wrap_native("create container", self.service.error_message()))?;
            match provisioned {
                Provisioned::Created => tracing::info!(
                    service = self.service.label(),
                    container = provisioner.container(),
                    "Created paste container"
                ),
                Provisioned::AlreadyPresent => tracing::debug!(
                    service = self.service.label(),
                    container = provisioner.container(),
                    "Paste container already present"
                ),
            }
        }
        self.runtime
            .block_on(self.objects.list_with_delimiter(None))
            .map_err(self.wrap("list bucket"))?;
        tracing::info!(service = self.service.label(), "Object paste store ready");
        Ok(())
    }

    fn new_paste(&self, paste_id: &str, content: &str) -> StoreResult<()> {
        let location = ObjectPath::from(paste_id);
        let payload = PutPayload::from(content.as_bytes().to_vec());
        self.runtime
            .block_on(self.objects.put(&location, payload))
            .map_err(self.wrap("upload paste"))?;
        Ok(())
    }

    fn update_paste_metadata(&self, paste_id: &str, metadata: &Metadata) -> StoreResult<()> {
        for key in metadata.keys() {
            validate_metadata_key(key)?;
        }
        let location = ObjectPath::from(paste_id);
        let options = PutOptions {
            attributes: to_attributes(metadata),
            ..Default::default()
        };
        self.runtime
            .block_on(async {
                let content = self.read_content(&location).await?;
                self.objects
                    .put_opts(&location, PutPayload::from(content), options)
                    .await
            })
            .map_err(self.wrap("replace metadata"))?;
        tracing::debug!(paste_id, keys = metadata.len(), "Replaced paste metadata");
        Ok(())
    }

    fn does_paste_exist(&self, paste_id: &str) -> StoreResult<bool> {
        let location = ObjectPath::from(paste_id);
        match self.runtime.block_on(self.objects.head(&location)) {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(self.wrap("check paste")(err)),
        }
    }

    fn get_paste_contents(&self, paste_id: &str) -> StoreResult<String> {
        let location = ObjectPath::from(paste_id);
        let bytes = self
            .runtime
            .block_on(self.read_content(&location))
            .map_err(self.wrap("download paste"))?;
        String::from_utf8(bytes).map_err(wrap_native("decode paste", self.service.error_message()))
    }

    fn get_paste_metadata(&self, paste_id: &str) -> StoreResult<Metadata> {
        let location = ObjectPath::from(paste_id);
        let metadata = self
            .runtime
            .block_on(self.read_attributes(&location))
            .map_err(self.wrap("read metadata"))?;
        require_metadata(metadata)
    }

    fn get_paste_metadata_value(&self, paste_id: &str, key: &str) -> StoreResult<Option<String>> {
        let location = ObjectPath::from(paste_id);
        let mut metadata = self
            .runtime
            .block_on(self.read_attributes(&location))
            .map_err(self.wrap("read metadata"))?;
        match metadata.remove(key) {
            Some(value) => Ok(Some(value)),
            None => missing_metadata_value(!metadata.is_empty()),
        }
    }

    fn get_all_paste_ids(
        &self,
        filters: &Metadata,
        fdefaults: &Metadata,
    ) -> StoreResult<Vec<String>> {
        let ids = self
            .runtime
            .block_on(self.list_matching(filters, fdefaults))
            .map_err(self.wrap("list pastes"))?;
        Ok(finish_listing(ids))
    }
}
