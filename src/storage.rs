mod error;
mod memory;
mod s3;
mod signing;

pub use error::StorageError;
pub use memory::MemoryStorage;
pub use s3::S3Storage;
pub use signing::Credentials;

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use md5::{Digest, Md5};

use crate::request::StorageConfig;
use crate::version::Version;

/// Access to the single remote state object named by the source
/// configuration.
///
/// `exists` followed by `fetch` is not transactional: the object may change
/// or disappear between the two calls.
#[async_trait]
pub trait StateStorage: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the object exists. Absence is `Ok(false)`, never an error.
    async fn exists(&self) -> Result<bool, StorageError>;

    /// Version of the object currently stored; `NotFound` when absent.
    async fn current_version(&self) -> Result<Version, StorageError>;

    /// Downloads the object to `destination` and returns the version observed
    /// while downloading. Nothing is left at `destination` on failure.
    async fn fetch(&self, destination: &Path) -> Result<Version, StorageError>;
}

pub fn open_storage(
    config: &StorageConfig,
    timeout: Duration,
) -> Result<Box<dyn StateStorage>, StorageError> {
    Ok(Box::new(S3Storage::from_config(config, timeout)?))
}

/// Checks `bytes` against a single-part MD5 digest.
///
/// Only a plain 32-character hex digest is an MD5 of the content. Multipart
/// ETags (`<hex>-<parts>`) and other opaque digests are not checked.
pub(crate) fn verify_digest(key: &str, expected: &str, bytes: &[u8]) -> Result<(), StorageError> {
    if !is_single_part_md5(expected) {
        tracing::debug!(key = %key, digest = %expected, "digest is not a plain MD5, skipping check");
        return Ok(());
    }
    let actual = hex::encode(Md5::digest(bytes));
    if actual != expected {
        return Err(StorageError::DigestMismatch {
            key: key.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

fn is_single_part_md5(digest: &str) -> bool {
    digest.len() == 32 && digest.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Writes `bytes` to a temporary sibling of `destination` and renames it into
/// place once complete.
pub(crate) async fn write_atomically(destination: &Path, bytes: Vec<u8>) -> Result<(), StorageError> {
    let destination = destination.to_path_buf();
    tokio::task::spawn_blocking(move || write_blocking(&destination, &bytes))
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
}

fn write_blocking(destination: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(destination).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}
