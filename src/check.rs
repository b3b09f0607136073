//! The `check` operation: report the current version of the state object.

use crate::error::ResourceError;
use crate::storage::{StateStorage, StorageError};
use crate::version::Version;

/// Versions to report, oldest first. An unchanged object repeats `previous`;
/// a missing object yields nothing.
pub async fn run_check(
    storage: &dyn StateStorage,
    previous: Option<&Version>,
) -> Result<Vec<Version>, ResourceError> {
    let current = match storage.current_version().await {
        Ok(version) => version,
        Err(StorageError::NotFound { key }) => {
            tracing::info!(key = %key, "state object does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    match previous {
        Some(prev) if *prev == current => Ok(vec![prev.clone()]),
        Some(prev) if prev.is_newer_than(&current) => {
            tracing::warn!(
                previous = %prev.last_modified,
                current = %current.last_modified,
                "stored object is older than the previous version"
            );
            Ok(vec![current])
        }
        _ => {
            tracing::info!(last_modified = %current.last_modified, "new version detected");
            Ok(vec![current])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn version() -> Version {
        Version::new("2024-01-01T00:00:00Z", "abc123")
    }

    #[tokio::test]
    async fn test_missing_object_reports_nothing() {
        let storage = MemoryStorage::new("k");
        assert!(run_check(&storage, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reports_current_without_previous() {
        let storage = MemoryStorage::new("k").with_object("{}", version());
        assert_eq!(run_check(&storage, None).await.unwrap(), vec![version()]);
    }

    #[tokio::test]
    async fn test_unchanged_repeats_previous() {
        let storage = MemoryStorage::new("k").with_object("{}", version());
        let result = run_check(&storage, Some(&version())).await.unwrap();
        assert_eq!(result, vec![version()]);
    }

    #[tokio::test]
    async fn test_changed_digest_reports_current() {
        let current = Version::new("2024-01-01T00:00:00Z", "def456");
        let storage = MemoryStorage::new("k").with_object("{}", current.clone());
        let result = run_check(&storage, Some(&version())).await.unwrap();
        assert_eq!(result, vec![current]);
    }

    #[tokio::test]
    async fn test_never_reports_previous_newer_than_current() {
        let previous = Version::new("2024-06-01T00:00:00Z", "def456");
        let storage = MemoryStorage::new("k").with_object("{}", version());
        let result = run_check(&storage, Some(&previous)).await.unwrap();
        assert_eq!(result, vec![version()]);
    }

    #[tokio::test]
    async fn test_access_denied_propagates() {
        let storage = MemoryStorage::new("k").deny_access();
        let err = run_check(&storage, None).await.unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Storage(StorageError::AccessDenied { .. })
        ));
    }
}
