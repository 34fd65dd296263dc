//! External collaborator seams: the content-addressed blob network and the
//! ownership ledger.
//!
//! The core never talks to a network itself. It goes through these traits,
//! which carry a caller-supplied timeout on every call; implementations must
//! honor it and return [`BackendError::Timeout`] instead of hanging. The
//! in-memory implementations back the default configuration and tests.

use crate::core::content_store::ContentHash;
use crate::core::ledger::VersionEntry;
use crate::error::DepotError;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure surfaced by a backend call
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend has no record of {0}")]
    Missing(String),

    #[error("{0}")]
    Unavailable(String),
}

impl From<BackendError> for DepotError {
    fn from(err: BackendError) -> Self {
        DepotError::BackendUnavailable(err.to_string())
    }
}

/// Content-addressed blob storage, addressed by SHA-256 digest.
///
/// `put` of identical bytes must be idempotent and return the same hash.
/// `forget` is advisory: a shared content-addressed network may keep the
/// bytes alive for other tenants, but the in-memory store erases them.
pub trait BlobBackend: Send + Sync {
    fn put(&self, bytes: &[u8], timeout: Duration) -> Result<ContentHash, BackendError>;
    fn get(&self, hash: &ContentHash, timeout: Duration) -> Result<Vec<u8>, BackendError>;
    fn forget(&self, hash: &ContentHash, timeout: Duration) -> Result<(), BackendError>;
}

/// Durable name-to-version record keeper (the ownership ledger).
///
/// The in-process [`VersionLedger`](crate::core::ledger::VersionLedger)
/// delegates durability here: every version is recorded before it is
/// committed locally, so the backend never lags the in-process view.
pub trait OwnershipBackend: Send + Sync {
    fn record_version(&self, entry: &VersionEntry, timeout: Duration) -> Result<(), BackendError>;
    fn read_version(
        &self,
        name: &str,
        version: u64,
        timeout: Duration,
    ) -> Result<VersionEntry, BackendError>;
    fn list_names(&self, timeout: Duration) -> Result<Vec<String>, BackendError>;
    fn remove_name(&self, name: &str, timeout: Duration) -> Result<(), BackendError>;
}

/// In-memory blob store
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<AHashMap<ContentHash, Arc<[u8]>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle, ready to hand to a builder.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobBackend for MemoryBlobStore {
    fn put(&self, bytes: &[u8], _timeout: Duration) -> Result<ContentHash, BackendError> {
        let hash = ContentHash::digest(bytes);
        self.blobs
            .write()
            .entry(hash)
            .or_insert_with(|| Arc::from(bytes));
        Ok(hash)
    }

    fn get(&self, hash: &ContentHash, _timeout: Duration) -> Result<Vec<u8>, BackendError> {
        self.blobs
            .read()
            .get(hash)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| BackendError::Missing(format!("blob {}", hash)))
    }

    fn forget(&self, hash: &ContentHash, _timeout: Duration) -> Result<(), BackendError> {
        self.blobs.write().remove(hash);
        Ok(())
    }
}

/// In-memory ownership log
#[derive(Default)]
pub struct MemoryOwnershipLog {
    records: RwLock<AHashMap<String, Vec<VersionEntry>>>,
}

impl MemoryOwnershipLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of recorded versions for a name, for tests inspecting the
    /// durable mirror.
    pub fn recorded_versions(&self, name: &str) -> usize {
        self.records.read().get(name).map_or(0, |v| v.len())
    }
}

impl OwnershipBackend for MemoryOwnershipLog {
    fn record_version(&self, entry: &VersionEntry, _timeout: Duration) -> Result<(), BackendError> {
        self.records
            .write()
            .entry(entry.file_name.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    fn read_version(
        &self,
        name: &str,
        version: u64,
        _timeout: Duration,
    ) -> Result<VersionEntry, BackendError> {
        self.records
            .read()
            .get(name)
            .and_then(|entries| entries.iter().find(|e| e.version == version))
            .cloned()
            .ok_or_else(|| BackendError::Missing(format!("version {} of {}", version, name)))
    }

    fn list_names(&self, _timeout: Duration) -> Result<Vec<String>, BackendError> {
        let mut names: Vec<String> = self.records.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn remove_name(&self, name: &str, _timeout: Duration) -> Result<(), BackendError> {
        self.records.write().remove(name);
        Ok(())
    }
}
