use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ResourceError;
use crate::version::Version;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Where the tracked state object lives and how to reach it.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub bucket_path: Option<String>,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.bucket.trim().is_empty() {
            return Err(ResourceError::Config(
                "source.storage.bucket must be set".to_string(),
            ));
        }
        if self.key.trim().trim_matches('/').is_empty() {
            return Err(ResourceError::Config(
                "source.storage.key must be set".to_string(),
            ));
        }
        if let Some(endpoint) = self.endpoint.as_deref().filter(|e| !e.is_empty()) {
            validate_endpoint(endpoint)?;
        }
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(_), None) | (None, Some(_)) => Err(ResourceError::Config(
                "access_key_id and secret_access_key must be set together".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn region(&self) -> &str {
        self.region_name
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGION)
    }

    /// Object key with `bucket_path` prepended.
    pub fn object_key(&self) -> String {
        let key = self.key.trim_start_matches('/');
        match self.bucket_path.as_deref().map(|p| p.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, key),
            _ => key.to_string(),
        }
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), ResourceError> {
    let url = Url::parse(endpoint).map_err(|e| {
        ResourceError::Config(format!(
            "source.storage.endpoint '{}' is not a valid URL: {}",
            endpoint, e
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ResourceError::Config(format!(
            "source.storage.endpoint '{}' must be an http(s) URL with a host",
            endpoint
        )));
    }
    Ok(())
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("region_name", &self.region_name)
            .field("endpoint", &self.endpoint)
            .field("bucket_path", &self.bucket_path)
            .field(
                "credentials",
                &self.access_key_id.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Lifecycle intent of the invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    #[serde(rename = "")]
    CreateOrUpdate,
    Destroy,
}

impl Action {
    pub fn parse(tag: &str) -> Result<Self, ResourceError> {
        match tag.trim() {
            "" | "update" | "create" => Ok(Action::CreateOrUpdate),
            "destroy" => Ok(Action::Destroy),
            other => Err(ResourceError::Config(format!(
                "unknown params.action '{}', expected '' or 'destroy'",
                other
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Action::parse(&tag).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// One JSON document named `metadata`.
    #[default]
    Combined,
    /// One file per output, named after the output.
    PerKey,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default)]
    pub action: Action,
    #[serde(default)]
    pub output_layout: OutputLayout,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InRequest {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default)]
    pub params: Params,
}

impl InRequest {
    pub fn from_json(input: &str) -> Result<Self, ResourceError> {
        let request: InRequest = serde_json::from_str(input)
            .map_err(|e| ResourceError::Config(format!("invalid request: {}", e)))?;
        request.source.storage.validate()?;
        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InResponse {
    pub version: Version,
    #[serde(default)]
    pub metadata: Vec<MetadataField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub version: Option<Version>,
}

impl CheckRequest {
    pub fn from_json(input: &str) -> Result<Self, ResourceError> {
        let request: CheckRequest = serde_json::from_str(input)
            .map_err(|e| ResourceError::Config(format!("invalid request: {}", e)))?;
        request.source.storage.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(bucket: &str, key: &str) -> StorageConfig {
        StorageConfig {
            bucket: bucket.to_string(),
            key: key.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_request_deserialization() {
        let json = r#"{
            "source": {"storage": {"bucket": "b", "key": "state/test.tfstate"}},
            "version": {"last_modified": "2024-06-01T00:00:00Z"},
            "params": {"action": "destroy"}
        }"#;
        let request = InRequest::from_json(json).unwrap();
        assert_eq!(request.source.storage.bucket, "b");
        assert_eq!(request.source.storage.key, "state/test.tfstate");
        assert_eq!(request.params.action, Action::Destroy);
        assert_eq!(request.params.output_layout, OutputLayout::Combined);
        assert_eq!(
            request.version.unwrap().last_modified,
            "2024-06-01T00:00:00Z"
        );
    }

    #[test]
    fn test_missing_action_is_create_or_update() {
        let json = r#"{"source": {"storage": {"bucket": "b", "key": "k"}}}"#;
        let request = InRequest::from_json(json).unwrap();
        assert_eq!(request.params.action, Action::CreateOrUpdate);
        assert!(request.version.is_none());
    }

    #[test]
    fn test_null_and_empty_action() {
        let json = r#"{"source": {"storage": {"bucket": "b", "key": "k"}}, "params": {"action": null}}"#;
        assert_eq!(
            InRequest::from_json(json).unwrap().params.action,
            Action::CreateOrUpdate
        );
        let json = r#"{"source": {"storage": {"bucket": "b", "key": "k"}}, "params": {"action": ""}}"#;
        assert_eq!(
            InRequest::from_json(json).unwrap().params.action,
            Action::CreateOrUpdate
        );
    }

    #[test]
    fn test_update_alias() {
        assert_eq!(Action::parse("update").unwrap(), Action::CreateOrUpdate);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let json = r#"{"source": {"storage": {"bucket": "b", "key": "k"}}, "params": {"action": "plan"}}"#;
        let err = InRequest::from_json(json).unwrap_err();
        assert!(matches!(err, ResourceError::Config(_)));
        assert!(err.to_string().contains("plan"));
    }

    #[test]
    fn test_missing_bucket_rejected() {
        let json = r#"{"source": {"storage": {"key": "k"}}}"#;
        let err = InRequest::from_json(json).unwrap_err();
        assert!(err.to_string().contains("bucket"));
    }

    #[test]
    fn test_missing_key_rejected() {
        let err = storage("b", "  ").validate().unwrap_err();
        assert!(err.to_string().contains("key"));
    }

    #[test]
    fn test_slash_only_key_rejected() {
        for key in ["/", "//", " / "] {
            let err = storage("b", key).validate().unwrap_err();
            assert!(matches!(err, ResourceError::Config(_)), "{:?} should be rejected", key);
        }
    }

    #[test]
    fn test_malformed_endpoint_rejected() {
        let json = r#"{"source": {"storage": {"bucket": "b", "key": "k", "endpoint": "not a url"}}}"#;
        let err = InRequest::from_json(json).unwrap_err();
        assert!(matches!(err, ResourceError::Config(_)));
        assert!(err.to_string().contains("endpoint"));

        for endpoint in ["localhost:9000", "ftp://minio.local", "file:///tmp/store"] {
            let config = StorageConfig {
                endpoint: Some(endpoint.to_string()),
                ..storage("b", "k")
            };
            assert!(config.validate().is_err(), "{:?} should be rejected", endpoint);
        }
    }

    #[test]
    fn test_valid_endpoint_accepted() {
        let config = StorageConfig {
            endpoint: Some("http://127.0.0.1:9000".to_string()),
            ..storage("b", "k")
        };
        assert!(config.validate().is_ok());
        let config = StorageConfig {
            endpoint: Some(String::new()),
            ..storage("b", "k")
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_half_credentials_rejected() {
        let config = StorageConfig {
            access_key_id: Some("AKIA".to_string()),
            ..storage("b", "k")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_object_key_with_prefix() {
        let config = StorageConfig {
            bucket_path: Some("/envs/prod/".to_string()),
            ..storage("b", "terraform.tfstate")
        };
        assert_eq!(config.object_key(), "envs/prod/terraform.tfstate");
        assert_eq!(storage("b", "/a/b").object_key(), "a/b");
    }

    #[test]
    fn test_region_default() {
        assert_eq!(storage("b", "k").region(), DEFAULT_REGION);
        let config = StorageConfig {
            region_name: Some("eu-west-1".to_string()),
            ..storage("b", "k")
        };
        assert_eq!(config.region(), "eu-west-1");
    }

    #[test]
    fn test_debug_does_not_expose_secret() {
        let config = StorageConfig {
            access_key_id: Some("AKIAEXAMPLE".to_string()),
            secret_access_key: Some("super_secret_key".to_string()),
            ..storage("b", "k")
        };
        let debug_output = format!("{:?}", config);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_key"));
        assert!(!debug_output.contains("AKIAEXAMPLE"));
    }

    #[test]
    fn test_response_serialization() {
        let response = InResponse {
            version: Version::new("2024-01-01T00:00:00Z", "abc123"),
            metadata: vec![MetadataField {
                name: "vpc_id".to_string(),
                value: "vpc-123".to_string(),
            }],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["version"]["last_modified"], "2024-01-01T00:00:00Z");
        assert_eq!(json["version"]["md5"], "abc123");
        assert_eq!(json["metadata"][0]["name"], "vpc_id");
    }
}
