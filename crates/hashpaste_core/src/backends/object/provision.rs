//! Create-if-absent for the bucket or container behind an object store.
//!
//! `object_store` only covers object-level calls, so the one-time container
//! setup goes through each service's own SDK.

use super::{AzureSettings, S3Settings};
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use azure_core::error::ErrorKind;
use azure_core::StatusCode;
use azure_storage::{CloudLocation, StorageCredentials};
use azure_storage_blobs::prelude::{ClientBuilder, ContainerClient};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::IntoFuture;
use std::time::Duration;

/// Region S3 assumes when none is configured; it rejects a location constraint.
pub(crate) const DEFAULT_S3_REGION: &str = "us-east-1";

pub(crate) type ProvisionError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Provisioned {
    Created,
    AlreadyPresent,
}

/// Makes sure the bucket or container a store writes into exists.
pub(crate) trait ContainerProvisioner: Send + Sync {
    /// Bucket or container name, for logs.
    fn container(&self) -> &str;

    fn ensure(&self) -> BoxFuture<'_, Result<Provisioned, ProvisionError>>;
}

fn timed_out(elapsed: tokio::time::error::Elapsed) -> ProvisionError {
    Box::new(elapsed)
}

/// S3 answers a repeated create with one of these codes.
pub(crate) fn s3_bucket_already_present(code: Option<&str>) -> bool {
    matches!(
        code,
        Some("BucketAlreadyOwnedByYou") | Some("BucketAlreadyExists")
    )
}

/// Azure answers a repeated create with 409 and this code.
pub(crate) fn azure_container_already_present(status: StatusCode, code: Option<&str>) -> bool {
    status == StatusCode::Conflict && code == Some("ContainerAlreadyExists")
}

pub(crate) struct S3Provisioner {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
    timeout: Duration,
}

impl S3Provisioner {
    pub(crate) fn new(settings: &S3Settings) -> Self {
        let region = settings
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_S3_REGION.to_string());
        let credentials = Credentials::new(
            &settings.access_key_id,
            &settings.secret_access_key,
            None,
            None,
            "hashpaste",
        );
        let mut config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.clone()));
        if let Some(endpoint) = &settings.endpoint {
            config = config.endpoint_url(endpoint).force_path_style(true);
        }
        Self {
            client: aws_sdk_s3::Client::from_conf(config.build()),
            bucket: settings.bucket.clone(),
            region,
            timeout: settings.timeout,
        }
    }
}

impl ContainerProvisioner for S3Provisioner {
    fn container(&self) -> &str {
        &self.bucket
    }

    fn ensure(&self) -> BoxFuture<'_, Result<Provisioned, ProvisionError>> {
        async move {
            let mut request = self.client.create_bucket().bucket(&self.bucket);
            if self.region != DEFAULT_S3_REGION {
                request = request.create_bucket_configuration(
                    CreateBucketConfiguration::builder()
                        .location_constraint(BucketLocationConstraint::from(
                            self.region.as_str(),
                        ))
                        .build(),
                );
            }
            let response = tokio::time::timeout(self.timeout, request.send())
                .await
                .map_err(timed_out)?;
            match response {
                Ok(_) => Ok(Provisioned::Created),
                Err(err)
                    if s3_bucket_already_present(
                        err.as_service_error().and_then(ProvideErrorMetadata::code),
                    ) =>
                {
                    Ok(Provisioned::AlreadyPresent)
                }
                Err(err) => Err(Box::new(err) as ProvisionError),
            }
        }
        .boxed()
    }
}

pub(crate) struct AzureProvisioner {
    client: ContainerClient,
    container: String,
    timeout: Duration,
}

impl AzureProvisioner {
    pub(crate) fn new(settings: &AzureSettings) -> Self {
        let credentials = StorageCredentials::access_key(
            settings.account_name.clone(),
            settings.account_key.clone(),
        );
        let builder = match &settings.endpoint {
            Some(uri) => ClientBuilder::with_location(
                CloudLocation::Custom {
                    account: settings.account_name.clone(),
                    uri: uri.clone(),
                },
                credentials,
            ),
            None => ClientBuilder::new(settings.account_name.clone(), credentials),
        };
        Self {
            client: builder.container_client(settings.container.clone()),
            container: settings.container.clone(),
            timeout: settings.timeout,
        }
    }
}

impl ContainerProvisioner for AzureProvisioner {
    fn container(&self) -> &str {
        &self.container
    }

    fn ensure(&self) -> BoxFuture<'_, Result<Provisioned, ProvisionError>> {
        async move {
            let response = tokio::time::timeout(self.timeout, self.client.create().into_future())
                .await
                .map_err(timed_out)?;
            match response {
                Ok(_) => Ok(Provisioned::Created),
                Err(err) => match err.kind() {
                    ErrorKind::HttpResponse { status, error_code }
                        if azure_container_already_present(*status, error_code.as_deref()) =>
                    {
                        Ok(Provisioned::AlreadyPresent)
                    }
                    _ => Err(Box::new(err) as ProvisionError),
                },
            }
        }
        .boxed()
    }
}
