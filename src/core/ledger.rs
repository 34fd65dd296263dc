//! Per-name append-only version history
//!
//! Each file name owns a contiguous, 1-based stream of immutable
//! [`VersionEntry`] records. Version assignment is linearized per name
//! through a lock table, so writes to different names never contend.
//! Durability is delegated to the [`OwnershipBackend`]: a version is
//! recorded there before it becomes visible locally.

use crate::core::backend::OwnershipBackend;
use crate::core::content_store::{ContentHash, ContentStore};
use crate::core::namespace::NamespaceTree;
use crate::error::{DepotError, Result};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Which version of a file a read refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionSelector {
    /// The newest committed version
    Latest,
    /// A specific 1-based version number
    Exact(u64),
}

/// One immutable record in a file's version stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub file_name: String,
    /// 1-based, contiguous per file
    pub version: u64,
    pub content_hash: ContentHash,
    pub folder_path: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

/// Derived view of a file's stream: owner, first/last timestamps, and the
/// latest entry. Computed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSnapshot {
    pub owner: String,
    pub first_created_at: DateTime<Utc>,
    pub version_count: u64,
    pub latest: VersionEntry,
}

struct VersionStream {
    owner: String,
    entries: Vec<VersionEntry>,
}

/// Lock table handing out one mutex per file name.
struct NameLocks {
    inner: Mutex<AHashMap<String, Arc<Mutex<()>>>>,
}

impl NameLocks {
    fn new() -> Self {
        NameLocks {
            inner: Mutex::new(AHashMap::new()),
        }
    }

    fn acquire(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.inner.lock();
        Arc::clone(
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn discard(&self, name: &str) {
        self.inner.lock().remove(name);
    }

    fn clear(&self) {
        self.inner.lock().clear();
    }
}

/// Append-only version ledger for all file names
pub struct VersionLedger {
    streams: RwLock<AHashMap<String, VersionStream>>,
    locks: NameLocks,
    backend: Arc<dyn OwnershipBackend>,
    backend_timeout: Duration,
}

impl VersionLedger {
    pub fn new(backend: Arc<dyn OwnershipBackend>, backend_timeout: Duration) -> Self {
        VersionLedger {
            streams: RwLock::new(AHashMap::new()),
            locks: NameLocks::new(),
            backend,
            backend_timeout,
        }
    }

    /// Append a new version for `name`.
    ///
    /// The first append fixes the owner; later appends must present the
    /// same owner. The folder must exist at write time. The record is
    /// durably mirrored to the ownership backend before local commit, so a
    /// backend failure leaves the stream untouched (the caller then rolls
    /// back its content refcount).
    pub fn append(
        &self,
        name: &str,
        content_hash: ContentHash,
        folder_path: &str,
        owner: &str,
        folders: &NamespaceTree,
    ) -> Result<VersionEntry> {
        let lock = self.locks.acquire(name);
        let _guard = lock.lock();

        if !folders.exists(folder_path) {
            return Err(DepotError::FolderNotFound(folder_path.to_string()));
        }

        let next_version = {
            let streams = self.streams.read();
            match streams.get(name) {
                Some(stream) if stream.owner != owner => {
                    return Err(DepotError::Unauthorized {
                        name: name.to_string(),
                        principal: owner.to_string(),
                    });
                }
                Some(stream) => stream.entries.len() as u64 + 1,
                None => 1,
            }
        };

        let entry = VersionEntry {
            file_name: name.to_string(),
            version: next_version,
            content_hash,
            folder_path: folder_path.to_string(),
            owner: owner.to_string(),
            created_at: Utc::now(),
        };

        self.backend.record_version(&entry, self.backend_timeout)?;

        let mut streams = self.streams.write();
        streams
            .entry(name.to_string())
            .or_insert_with(|| VersionStream {
                owner: owner.to_string(),
                entries: Vec::new(),
            })
            .entries
            .push(entry.clone());
        debug!("appended version {} of {}", next_version, name);
        Ok(entry)
    }

    /// Resolve a selector to a concrete version entry.
    pub fn resolve(&self, name: &str, selector: VersionSelector) -> Result<VersionEntry> {
        let streams = self.streams.read();
        let stream = streams
            .get(name)
            .ok_or_else(|| DepotError::FileNotFound(name.to_string()))?;
        match selector {
            VersionSelector::Latest => Ok(stream
                .entries
                .last()
                .expect("a version stream is never empty")
                .clone()),
            VersionSelector::Exact(version) => {
                if version == 0 || version > stream.entries.len() as u64 {
                    return Err(DepotError::VersionNotFound {
                        name: name.to_string(),
                        version,
                    });
                }
                Ok(stream.entries[(version - 1) as usize].clone())
            }
        }
    }

    /// Resolve a selector and the current latest version in one consistent
    /// read, for cache fills that report both.
    pub fn resolve_with_latest(
        &self,
        name: &str,
        selector: VersionSelector,
    ) -> Result<(VersionEntry, u64)> {
        let streams = self.streams.read();
        let stream = streams
            .get(name)
            .ok_or_else(|| DepotError::FileNotFound(name.to_string()))?;
        let latest = stream.entries.len() as u64;
        let entry = match selector {
            VersionSelector::Latest => stream
                .entries
                .last()
                .expect("a version stream is never empty")
                .clone(),
            VersionSelector::Exact(version) => {
                if version == 0 || version > latest {
                    return Err(DepotError::VersionNotFound {
                        name: name.to_string(),
                        version,
                    });
                }
                stream.entries[(version - 1) as usize].clone()
            }
        };
        Ok((entry, latest))
    }

    /// Full history of a name, oldest first. The returned vector is an
    /// independent snapshot and can be iterated any number of times.
    pub fn history(&self, name: &str) -> Result<Vec<VersionEntry>> {
        let streams = self.streams.read();
        let stream = streams
            .get(name)
            .ok_or_else(|| DepotError::FileNotFound(name.to_string()))?;
        Ok(stream.entries.clone())
    }

    /// Append a new version whose content is copied from `target_version`.
    ///
    /// The target's content hash gains a reference instead of the bytes
    /// being uploaded again; the reference is dropped if the ownership
    /// backend rejects the new record.
    pub fn revert(
        &self,
        name: &str,
        target_version: u64,
        content: &ContentStore,
    ) -> Result<VersionEntry> {
        let lock = self.locks.acquire(name);
        let _guard = lock.lock();

        let (target, next_version, owner) = {
            let streams = self.streams.read();
            let stream = streams
                .get(name)
                .ok_or_else(|| DepotError::FileNotFound(name.to_string()))?;
            if target_version == 0 || target_version > stream.entries.len() as u64 {
                return Err(DepotError::VersionNotFound {
                    name: name.to_string(),
                    version: target_version,
                });
            }
            (
                stream.entries[(target_version - 1) as usize].clone(),
                stream.entries.len() as u64 + 1,
                stream.owner.clone(),
            )
        };

        content.inc_ref(&target.content_hash)?;

        let entry = VersionEntry {
            file_name: name.to_string(),
            version: next_version,
            content_hash: target.content_hash,
            folder_path: target.folder_path.clone(),
            owner,
            created_at: Utc::now(),
        };

        if let Err(err) = self.backend.record_version(&entry, self.backend_timeout) {
            let _ = content.dec_ref(&target.content_hash);
            return Err(err.into());
        }

        let mut streams = self.streams.write();
        streams
            .get_mut(name)
            .expect("stream cannot vanish while its name lock is held")
            .entries
            .push(entry.clone());
        debug!(
            "reverted {} to version {} as version {}",
            name, target_version, next_version
        );
        Ok(entry)
    }

    /// Remove a name's entire stream, returning every entry so the caller
    /// can release one content reference per entry.
    ///
    /// A later upload of the same name starts a fresh stream at version 1.
    pub fn delete(&self, name: &str) -> Result<Vec<VersionEntry>> {
        let lock = self.locks.acquire(name);
        let _guard = lock.lock();

        if !self.streams.read().contains_key(name) {
            return Err(DepotError::FileNotFound(name.to_string()));
        }

        self.backend.remove_name(name, self.backend_timeout)?;

        let stream = self
            .streams
            .write()
            .remove(name)
            .expect("stream cannot vanish while its name lock is held");
        self.locks.discard(name);
        debug!("deleted {} ({} versions)", name, stream.entries.len());
        Ok(stream.entries)
    }

    /// Owner of a name, `None` if unknown.
    pub fn owner(&self, name: &str) -> Option<String> {
        self.streams
            .read()
            .get(name)
            .map(|stream| stream.owner.clone())
    }

    /// Latest committed version number of a name.
    pub fn latest_version(&self, name: &str) -> Result<u64> {
        let streams = self.streams.read();
        let stream = streams
            .get(name)
            .ok_or_else(|| DepotError::FileNotFound(name.to_string()))?;
        Ok(stream.entries.len() as u64)
    }

    /// Derived record for one name.
    pub fn snapshot(&self, name: &str) -> Result<StreamSnapshot> {
        let streams = self.streams.read();
        let stream = streams
            .get(name)
            .ok_or_else(|| DepotError::FileNotFound(name.to_string()))?;
        Ok(Self::snapshot_of(stream))
    }

    /// Derived records for every file whose latest version lives in
    /// `folder_path`, sorted by file name.
    pub fn snapshots_in_folder(&self, folder_path: &str) -> Vec<StreamSnapshot> {
        let streams = self.streams.read();
        let mut snapshots: Vec<StreamSnapshot> = streams
            .values()
            .filter(|stream| {
                stream
                    .entries
                    .last()
                    .is_some_and(|entry| entry.folder_path == folder_path)
            })
            .map(Self::snapshot_of)
            .collect();
        snapshots.sort_by(|a, b| a.latest.file_name.cmp(&b.latest.file_name));
        snapshots
    }

    fn snapshot_of(stream: &VersionStream) -> StreamSnapshot {
        let first = stream
            .entries
            .first()
            .expect("a version stream is never empty");
        let latest = stream
            .entries
            .last()
            .expect("a version stream is never empty");
        StreamSnapshot {
            owner: stream.owner.clone(),
            first_created_at: first.created_at,
            version_count: stream.entries.len() as u64,
            latest: latest.clone(),
        }
    }

    /// Whether a name currently has a stream.
    pub fn has_file(&self, name: &str) -> bool {
        self.streams.read().contains_key(name)
    }

    /// Number of live file names.
    pub fn file_count(&self) -> usize {
        self.streams.read().len()
    }

    /// Drop every stream and name lock. Test-reset hook; the ownership
    /// backend keeps whatever it has recorded.
    pub fn clear(&self) {
        self.streams.write().clear();
        self.locks.clear();
    }
}
