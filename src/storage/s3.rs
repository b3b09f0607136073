use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::header::{AUTHORIZATION, ETAG, HeaderMap, HeaderName, LAST_MODIFIED};
use reqwest::{Method, StatusCode, Url};

use super::signing::{self, Credentials};
use super::{StateStorage, StorageError, verify_digest, write_atomically};
use crate::request::StorageConfig;
use crate::version::{self, Version};

/// S3 accessor speaking the REST API directly.
#[derive(Clone)]
pub struct S3Storage {
    client: reqwest::Client,
    base_url: String,
    object_path: String,
    key: String,
    region: String,
    credentials: Option<Credentials>,
}

impl S3Storage {
    pub fn from_config(config: &StorageConfig, timeout: Duration) -> Result<Self, StorageError> {
        match config.endpoint.as_deref().filter(|e| !e.is_empty()) {
            Some(endpoint) => Self::with_base_url(config, endpoint.to_string(), timeout),
            None => {
                let base_url = format!(
                    "https://{}.s3.{}.amazonaws.com",
                    config.bucket,
                    config.region()
                );
                let key = config.object_key();
                Self::create_client(config, base_url, format!("/{}", key), key, timeout)
            }
        }
    }

    /// Path-style addressing against a custom endpoint.
    ///
    /// NOTE: Also used for testing with mock servers.
    pub fn with_base_url(
        config: &StorageConfig,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let key = config.object_key();
        let object_path = format!("/{}/{}", config.bucket, key);
        Self::create_client(config, base_url, object_path, key, timeout)
    }

    fn create_client(
        config: &StorageConfig,
        base_url: String,
        object_path: String,
        key: String,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StorageError::Transport)?;

        let credentials = match (&config.access_key_id, &config.secret_access_key) {
            (Some(id), Some(secret)) => Some(Credentials {
                access_key_id: id.clone(),
                secret_access_key: secret.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            object_path,
            key,
            region: config.region().to_string(),
            credentials,
        })
    }

    pub fn object_url(&self) -> String {
        format!("{}{}", self.base_url, signing::canonical_uri(&self.object_path))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn send(&self, method: Method) -> Result<reqwest::Response, StorageError> {
        let url = Url::parse(&self.object_url()).map_err(|e| StorageError::Api {
            status: 0,
            message: format!("invalid object URL: {}", e),
        })?;

        let mut request = self.client.request(method.clone(), url.clone());

        if let Some(credentials) = &self.credentials {
            let host = match (url.host_str(), url.port()) {
                (Some(host), Some(port)) => format!("{}:{}", host, port),
                (Some(host), None) => host.to_string(),
                (None, _) => String::new(),
            };
            let signature = signing::sign(
                credentials,
                &self.region,
                method.as_str(),
                &host,
                url.path(),
                &[],
                chrono::Utc::now(),
            );
            request = request
                .header(AUTHORIZATION, signature.authorization)
                .header("x-amz-date", signature.amz_date)
                .header("x-amz-content-sha256", signature.content_sha256);
        }

        Ok(request.send().await?)
    }

    async fn error_for(&self, response: reqwest::Response) -> StorageError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = xml_tag(&body, "Message")
            .or_else(|| xml_tag(&body, "Code"))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

        match status {
            StatusCode::NOT_FOUND => StorageError::NotFound {
                key: self.key.clone(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                StorageError::AccessDenied { message }
            }
            other => StorageError::Api {
                status: other.as_u16(),
                message,
            },
        }
    }

    async fn head(&self) -> Result<Version, StorageError> {
        let response = self.send(Method::HEAD).await?;
        if !response.status().is_success() {
            return Err(self.error_for(response).await);
        }
        version_from_headers(response.status(), response.headers())
    }
}

#[async_trait]
impl StateStorage for S3Storage {
    fn name(&self) -> &str {
        "s3"
    }

    async fn exists(&self) -> Result<bool, StorageError> {
        match self.head().await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn current_version(&self) -> Result<Version, StorageError> {
        self.head().await
    }

    async fn fetch(&self, destination: &Path) -> Result<Version, StorageError> {
        let response = self.send(Method::GET).await?;
        if !response.status().is_success() {
            return Err(self.error_for(response).await);
        }

        let version = version_from_headers(response.status(), response.headers())?;
        let bytes = response.bytes().await?;
        let len = bytes.len();

        verify_digest(&self.key, &version.content_digest, &bytes)?;
        write_atomically(destination, bytes.to_vec()).await?;

        tracing::debug!(
            key = %self.key,
            bytes = len,
            last_modified = %version.last_modified,
            "object downloaded"
        );

        Ok(version)
    }
}

impl std::fmt::Debug for S3Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Storage")
            .field("base_url", &self.base_url)
            .field("key", &self.key)
            .field("region", &self.region)
            .field("credentials", &self.credentials.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn version_from_headers(status: StatusCode, headers: &HeaderMap) -> Result<Version, StorageError> {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };

    let last_modified = header(LAST_MODIFIED)
        .and_then(|raw| version::from_http_date(&raw))
        .ok_or_else(|| StorageError::Api {
            status: status.as_u16(),
            message: "response is missing a valid Last-Modified header".to_string(),
        })?;

    let content_digest = header(ETAG)
        .map(|raw| version::digest_from_etag(&raw))
        .filter(|d| !d.is_empty())
        .ok_or_else(|| StorageError::Api {
            status: status.as_u16(),
            message: "response is missing an ETag header".to_string(),
        })?;

    Ok(Version {
        last_modified,
        content_digest,
    })
}

/// Text of the first `<tag>` element in an S3 error document, unescaped.
fn xml_tag(body: &str, tag: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut inside = false;
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == tag.as_bytes() => inside = true,
            Ok(Event::Text(ref e)) if inside => text.push_str(&e.unescape().ok()?),
            Ok(Event::End(ref e)) if inside && e.name().as_ref() == tag.as_bytes() => {
                return Some(text).filter(|t| !t.is_empty());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}
