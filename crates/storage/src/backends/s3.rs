//! S3-compatible storage backend using the AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ObjectStore, StoredObject};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::future::ProvideCredentials as ProvideCredentialsFuture;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_smithy_http_client::Builder as SmithyHttpClientBuilder;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

/// Tag carried by lazy credential failures so they surface as configuration
/// errors instead of opaque S3 errors.
const CREDENTIALS_ERROR_TAG: &str = "sluice-s3-credentials";

const DEFAULT_REGION: &str = "us-east-1";
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`S3Backend::connect`].
#[derive(Clone, Debug, Default)]
pub struct S3Options {
    pub bucket: String,
    /// Custom endpoint (MinIO and friends). Bare `host:port` means plain HTTP.
    pub endpoint: Option<String>,
    pub region: Option<String>,
    /// Key prefix every document key is placed under.
    pub prefix: Option<String>,
    /// Static `(access_key_id, secret_access_key)`. The default credential
    /// chain is used when absent.
    pub credentials: Option<(String, String)>,
    /// Use `endpoint/bucket/key` URLs.
    pub force_path_style: bool,
}

/// Resolves the AWS default credential chain on the first signed request, so
/// constructing a backend never blocks on instance metadata lookups.
#[derive(Debug)]
struct LazyCredentials {
    region: String,
    chain: OnceCell<DefaultCredentialsChain>,
}

impl LazyCredentials {
    fn new(region: String) -> Self {
        Self {
            region,
            chain: OnceCell::new(),
        }
    }

    async fn resolve(&self) -> aws_credential_types::provider::Result {
        let chain = self
            .chain
            .get_or_try_init(|| async {
                let region = aws_config::Region::new(self.region.clone());
                tokio::spawn(async move {
                    DefaultCredentialsChain::builder().region(region).build().await
                })
                .await
                .map_err(|e| {
                    CredentialsError::provider_error(format!(
                        "{CREDENTIALS_ERROR_TAG}: building default chain failed: {e}"
                    ))
                })
            })
            .await?;

        chain.provide_credentials().await.map_err(|e| {
            CredentialsError::provider_error(format!(
                "{CREDENTIALS_ERROR_TAG}: no default credentials: {e}"
            ))
        })
    }
}

impl ProvideCredentials for LazyCredentials {
    fn provide_credentials<'a>(&'a self) -> ProvideCredentialsFuture<'a>
    where
        Self: 'a,
    {
        ProvideCredentialsFuture::new(self.resolve())
    }
}

/// HTTP status of a service error, if the request reached the service.
fn service_status<E>(err: &SdkError<E>) -> Option<u16> {
    match err {
        SdkError::ServiceError(service_err) => Some(service_err.raw().status().as_u16()),
        _ => None,
    }
}

/// Map an SDK failure on `key`: 404 and 403 become lookup failures, lazy
/// credential problems become configuration errors.
fn map_sdk_error<E>(err: SdkError<E>, key: &str) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    match service_status(&err) {
        Some(404) => StorageError::NotFound(key.to_string()),
        Some(403) => StorageError::AccessDenied(key.to_string()),
        _ if err.to_string().contains(CREDENTIALS_ERROR_TAG) => StorageError::Config(
            "S3 credentials unavailable; set access_key_id/secret_access_key or provide ambient AWS credentials"
                .to_string(),
        ),
        _ => StorageError::S3(Box::new(err)),
    }
}

/// S3-compatible object store.
pub struct S3Backend {
    client: Client,
    bucket: String,
    prefix: Option<String>,
    endpoint: String,
    region: String,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Build a client for `options`. No request is sent.
    pub async fn connect(options: S3Options) -> StorageResult<Self> {
        if options.bucket.trim().is_empty() {
            return Err(StorageError::Config(
                "s3 config requires a non-empty bucket".to_string(),
            ));
        }

        let region = options
            .region
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let endpoint = options.endpoint.map(|endpoint| {
            let lower = endpoint.to_ascii_lowercase();
            if lower.starts_with("http://") || lower.starts_with("https://") {
                endpoint
            } else {
                format!("http://{endpoint}")
            }
        });

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()))
            .force_path_style(options.force_path_style);

        builder = match options.credentials {
            Some((key_id, secret)) => builder.credentials_provider(
                aws_sdk_s3::config::Credentials::new(key_id, secret, None, None, "sluice-config"),
            ),
            None => builder.credentials_provider(LazyCredentials::new(region.clone())),
        };

        if let Some(url) = &endpoint {
            builder = builder.endpoint_url(url);
            // Plain HTTP endpoints need no native trust roots
            if url.to_ascii_lowercase().starts_with("http://") {
                builder = builder.http_client(SmithyHttpClientBuilder::new().build_http());
            }
        }

        let prefix = options
            .prefix
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: options.bucket,
            prefix,
            endpoint: endpoint.unwrap_or_else(|| format!("s3.{region}.amazonaws.com")),
            region,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Endpoint requests go to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Object key in the bucket for a document key.
    fn object_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    #[instrument(skip(self), fields(backend = "s3", bucket = %self.bucket))]
    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;

        let content_type = output.content_type().map(str::to_string);
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(Box::new(e)))?
            .into_bytes();
        debug!(size = data.len(), "Read object");

        Ok(StoredObject { data, content_type })
    }

    #[instrument(skip(self, data), fields(backend = "s3", bucket = %self.bucket, size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .body(data.into())
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }

    /// Checks the bucket is reachable with the configured credentials.
    #[instrument(skip(self), fields(backend = "s3", bucket = %self.bucket))]
    async fn health_check(&self) -> StorageResult<()> {
        let head = self.client.head_bucket().bucket(&self.bucket).send();

        match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, head).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(match service_status(&e) {
                Some(404) => StorageError::Config(format!("bucket does not exist: {}", self.bucket)),
                _ => map_sdk_error(e, &self.bucket),
            }),
            Err(_) => Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!(
                    "S3 health check timed out after {}s",
                    HEALTH_CHECK_TIMEOUT.as_secs()
                ),
            ))),
        }
    }
}
