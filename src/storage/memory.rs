use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{StateStorage, StorageError, write_atomically};
use crate::version::Version;

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    version: Version,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Fault {
    #[default]
    Healthy,
    DenyAll,
    /// Object disappears between `exists` and `fetch`.
    VanishOnFetch,
}

#[derive(Debug, Default)]
struct Inner {
    object: Option<StoredObject>,
    fault: Fault,
    fetch_count: usize,
}

/// In-memory accessor holding at most one object under a fixed key.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    key: String,
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStorage {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    pub fn with_object(self, bytes: impl Into<Vec<u8>>, version: Version) -> Self {
        self.put(bytes, version);
        self
    }

    fn put(&self, bytes: impl Into<Vec<u8>>, version: Version) {
        let mut inner = self.write();
        inner.object = Some(StoredObject {
            bytes: bytes.into(),
            version,
        });
    }

    fn remove(&self) {
        self.write().object = None;
    }

    /// Every call fails with `AccessDenied`.
    pub fn deny_access(self) -> Self {
        self.write().fault = Fault::DenyAll;
        self
    }

    /// `exists` reports the object, then `fetch` finds it gone.
    pub fn vanish_on_fetch(self) -> Self {
        self.write().fault = Fault::VanishOnFetch;
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.read().fetch_count
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fault(&self) -> Fault {
        self.read().fault
    }

    fn denied(&self) -> StorageError {
        StorageError::AccessDenied {
            message: format!("access to '{}' denied", self.key),
        }
    }

    fn not_found(&self) -> StorageError {
        StorageError::NotFound {
            key: self.key.clone(),
        }
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    async fn exists(&self) -> Result<bool, StorageError> {
        if self.fault() == Fault::DenyAll {
            return Err(self.denied());
        }
        Ok(self.read().object.is_some())
    }

    async fn current_version(&self) -> Result<Version, StorageError> {
        if self.fault() == Fault::DenyAll {
            return Err(self.denied());
        }
        self.read()
            .object
            .as_ref()
            .map(|o| o.version.clone())
            .ok_or_else(|| self.not_found())
    }

    async fn fetch(&self, destination: &Path) -> Result<Version, StorageError> {
        match self.fault() {
            Fault::DenyAll => return Err(self.denied()),
            Fault::VanishOnFetch => self.remove(),
            Fault::Healthy => {}
        }

        let object = {
            let mut inner = self.write();
            inner.fetch_count += 1;
            inner.object.clone()
        };
        let object = object.ok_or_else(|| self.not_found())?;

        write_atomically(destination, object.bytes).await?;
        Ok(object.version)
    }
}
