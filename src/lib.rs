//! # Depot - Versioned Content-Addressed File Namespace
//!
//! `depot-rs` stores named files with full version history inside a
//! hierarchical folder namespace. The bytes live in a content-addressed
//! blob backend and are deduplicated by SHA-256 digest with reference
//! counting; the name-to-hash mapping is an append-only per-name version
//! ledger mirrored to an ownership backend. On top of that sit per-file
//! access grants, name/content search, a TTL read cache, and per-identity
//! admission control.
//!
//! - **Deduplicated storage**: identical bytes are stored once, however
//!   many names or versions reference them
//! - **Append-only history** with contiguous 1-based versions, revert by
//!   reference, and delete-with-cleanup
//! - **Idempotent folders**: creating an existing folder is a success
//! - **Per-name linearization**: writes to one file are serialized, writes
//!   to different files run in parallel
//!
//! ## Quick Start
//!
//! ```rust
//! use depot_rs::Depot;
//!
//! let depot = Depot::new();
//!
//! // Upload a file (folders are created on demand)
//! let receipt = depot.upload("alice", "report.txt", b"draft one", "/docs/")?;
//! assert_eq!(receipt.version, 1);
//!
//! // Read it back
//! let file = depot.get_file("alice", "report.txt", None)?;
//! assert_eq!(file.bytes, b"draft one");
//!
//! // Share it
//! depot.share("alice", "report.txt", "bob")?;
//! assert!(depot.is_authorized("report.txt", "bob"));
//! # Ok::<(), depot_rs::DepotError>(())
//! ```
//!
//! ## Advanced Usage
//!
//! ```rust
//! use depot_rs::{DepotBuilder, RateLimiterConfig};
//! use std::time::Duration;
//!
//! let depot = DepotBuilder::new()
//!     .cache_ttl(Duration::from_secs(120))
//!     .cache_capacity(4096)
//!     .rate_limits(RateLimiterConfig::default())
//!     .backend_timeout(Duration::from_secs(2))
//!     .build();
//!
//! depot.create_folder("alice", "/projects/")?;
//! # Ok::<(), depot_rs::DepotError>(())
//! ```
//!
//! Deleting a name removes its entire history; a later upload of the same
//! name starts again at version 1. Peers that rely on version numbers
//! surviving a delete-and-recreate cycle should treat that as a
//! compatibility caveat.

pub mod core;
pub mod error;

pub use crate::core::{
    acl::AclGrant,
    backend::{BackendError, BlobBackend, MemoryBlobStore, MemoryOwnershipLog, OwnershipBackend},
    cache::CacheLayer,
    content_store::ContentHash,
    ledger::{StreamSnapshot, VersionEntry, VersionSelector},
    namespace::Folder,
    rate_limit::{OpClass, RateLimiterConfig},
    search::SearchDocument,
};
pub use crate::error::{DepotError, ErrorKind, RateGate, Result};

use crate::core::acl::AccessControl;
use crate::core::content_store::ContentStore;
use crate::core::ledger::VersionLedger;
use crate::core::namespace::NamespaceTree;
use crate::core::rate_limit::RateLimiter;
use crate::core::search::SearchIndex;
use crate::core::validation::{
    folder_name, normalize_folder_path, validate_file_name, validate_principal,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub content_hash: ContentHash,
    pub version: u64,
}

/// A resolved file read: the bytes plus the version context they came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub bytes: Vec<u8>,
    pub version: u64,
    pub latest_version: u64,
    pub folder_path: String,
    pub created_at: DateTime<Utc>,
}

/// One line of a file's version history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version: u64,
    pub content_hash: ContentHash,
    pub created_at: DateTime<Utc>,
}

/// Derived record describing a file's current state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_name: String,
    pub folder_path: String,
    pub owner: String,
    pub latest_version: u64,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// A directory listing item: a file at its latest version, or a subfolder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Just the name (e.g. "report.txt" or "reports")
    pub name: String,

    /// Full path: folder path for folders, folder + name for files
    pub path: String,

    pub is_folder: bool,

    /// Latest version number (None for folders)
    pub version: Option<u64>,

    /// Size in bytes of the latest version (None for folders)
    pub size: Option<u64>,

    /// Owning principal (None for folders)
    pub owner: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Point-in-time component counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepotStats {
    pub files: usize,
    pub folders: usize,
    pub blobs: usize,
    pub search_docs: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// The depot engine: every request-surface operation lives here.
///
/// All components use interior locking, so a `Depot` is shared by
/// reference (or `Arc`) across request handlers; no operation blocks the
/// whole engine, and operations on different file names proceed in
/// parallel.
pub struct Depot {
    content: ContentStore,
    ledger: VersionLedger,
    namespace: NamespaceTree,
    acl: AccessControl,
    search: SearchIndex,
    cache: CacheLayer<FileContent>,
    limiter: RateLimiter,
}

impl Depot {
    /// Create a depot with default configuration and in-memory backends.
    pub fn new() -> Self {
        DepotBuilder::new().build()
    }

    /// Store a new version of `name` under `folder_path`.
    ///
    /// The folder (and any missing ancestors) is created on demand. The
    /// first upload of a name fixes its owner; later uploads must come
    /// from the same principal. If the version cannot be recorded after
    /// the bytes were stored, the content reference is rolled back so no
    /// orphaned blob survives.
    pub fn upload(
        &self,
        caller: &str,
        name: &str,
        bytes: &[u8],
        folder_path: &str,
    ) -> Result<UploadReceipt> {
        validate_principal(caller)?;
        self.limiter.admit(caller, OpClass::Upload)?;
        validate_file_name(name)?;
        let folder = self.namespace.ensure_folder(folder_path)?;

        let hash = self.content.put(bytes)?;
        let entry = match self
            .ledger
            .append(name, hash, &folder, caller, &self.namespace)
        {
            Ok(entry) => entry,
            Err(err) => {
                if let Err(rollback) = self.content.dec_ref(&hash) {
                    warn!("refcount rollback failed for {}: {}", hash, rollback);
                }
                return Err(err);
            }
        };

        self.cache.invalidate(name);
        self.search.index(name, &folder, bytes);
        info!(
            "stored version {} of {} ({} bytes) in {}",
            entry.version,
            name,
            bytes.len(),
            folder
        );
        Ok(UploadReceipt {
            content_hash: hash,
            version: entry.version,
        })
    }

    /// Read a file at a specific version, or the latest when `version` is
    /// `None`. Reads go through the TTL cache; a miss resolves against the
    /// ledger and content store and refills the cache.
    pub fn get_file(&self, caller: &str, name: &str, version: Option<u64>) -> Result<FileContent> {
        validate_principal(caller)?;
        self.limiter.admit(caller, OpClass::Request)?;
        validate_file_name(name)?;
        self.authorize_read(name, caller)?;

        let selector = version
            .map(VersionSelector::Exact)
            .unwrap_or(VersionSelector::Latest);
        if let Some(content) = self.cache.get(name, selector) {
            debug!("cache hit for {} ({:?})", name, selector);
            return Ok(content);
        }

        let token = self.cache.read_token(name);
        let (entry, latest) = self.ledger.resolve_with_latest(name, selector)?;
        let bytes = self.content.get(&entry.content_hash)?;
        let content = FileContent {
            bytes,
            version: entry.version,
            latest_version: latest,
            folder_path: entry.folder_path,
            created_at: entry.created_at,
        };
        self.cache.set(name, selector, content.clone(), token);
        Ok(content)
    }

    /// List the direct children of a folder: subfolders plus files whose
    /// latest version lives there. Folders sort first, then names.
    pub fn list(&self, caller: &str, folder_path: &str) -> Result<Vec<Entry>> {
        validate_principal(caller)?;
        self.limiter.admit(caller, OpClass::Request)?;
        let folder = normalize_folder_path(folder_path)?;
        if !self.namespace.exists(&folder) {
            return Err(DepotError::FolderNotFound(folder));
        }

        let mut entries: Vec<Entry> = self
            .namespace
            .child_folders(&folder)
            .into_iter()
            .map(|child| Entry {
                name: folder_name(&child.path).to_string(),
                path: child.path.clone(),
                is_folder: true,
                version: None,
                size: None,
                owner: None,
                created_at: Some(child.created_at),
                modified_at: None,
            })
            .collect();

        for snapshot in self.ledger.snapshots_in_folder(&folder) {
            entries.push(Entry {
                name: snapshot.latest.file_name.clone(),
                path: format!("{}{}", folder, snapshot.latest.file_name),
                is_folder: false,
                version: Some(snapshot.latest.version),
                size: self.content.size_of(&snapshot.latest.content_hash),
                owner: Some(snapshot.owner),
                created_at: Some(snapshot.first_created_at),
                modified_at: Some(snapshot.latest.created_at),
            });
        }

        entries.sort_by(|a, b| match (a.is_folder, b.is_folder) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a.name.cmp(&b.name),
        });
        Ok(entries)
    }

    /// Delete a file: its whole version history, its grants, its search
    /// document, and one content reference per version entry.
    pub fn delete_file(&self, caller: &str, name: &str) -> Result<()> {
        validate_principal(caller)?;
        self.limiter.admit(caller, OpClass::Request)?;
        validate_file_name(name)?;
        self.require_owner(name, caller)?;

        let entries = self.ledger.delete(name)?;
        for entry in &entries {
            if let Err(err) = self.content.dec_ref(&entry.content_hash) {
                warn!(
                    "releasing content reference {} of deleted {} failed: {}",
                    entry.content_hash, name, err
                );
            }
        }
        self.cache.invalidate(name);
        self.acl.remove_all(name);
        self.search.remove(name);
        info!("deleted {} ({} versions)", name, entries.len());
        Ok(())
    }

    /// Version history of a file, oldest first.
    pub fn history(&self, caller: &str, name: &str) -> Result<Vec<VersionSummary>> {
        validate_principal(caller)?;
        self.limiter.admit(caller, OpClass::Request)?;
        validate_file_name(name)?;
        self.authorize_read(name, caller)?;

        Ok(self
            .ledger
            .history(name)?
            .into_iter()
            .map(|entry| VersionSummary {
                version: entry.version,
                content_hash: entry.content_hash,
                created_at: entry.created_at,
            })
            .collect())
    }

    /// Append a new version whose content equals `target_version`'s.
    /// History is never rewritten; the restored bytes gain a reference
    /// instead of being uploaded again. Returns the new version number.
    pub fn revert(&self, caller: &str, name: &str, target_version: u64) -> Result<u64> {
        validate_principal(caller)?;
        self.limiter.admit(caller, OpClass::Request)?;
        validate_file_name(name)?;
        self.require_owner(name, caller)?;

        let entry = self.ledger.revert(name, target_version, &self.content)?;
        self.cache.invalidate(name);
        match self.content.get(&entry.content_hash) {
            Ok(bytes) => self.search.index(name, &entry.folder_path, &bytes),
            // The ledger is the source of truth; the index catches up on
            // the next write instead of rolling the revert back.
            Err(err) => warn!("search re-index after reverting {} failed: {}", name, err),
        }
        info!(
            "reverted {} to version {} as version {}",
            name, target_version, entry.version
        );
        Ok(entry.version)
    }

    /// Create a folder (and missing ancestors); idempotent. Returns the
    /// canonical path.
    pub fn create_folder(&self, caller: &str, folder_path: &str) -> Result<String> {
        validate_principal(caller)?;
        self.limiter.admit(caller, OpClass::Request)?;
        let folder = self.namespace.ensure_folder(folder_path)?;
        info!("ensured folder {}", folder);
        Ok(folder)
    }

    /// Remove an empty folder. Fails while any file's latest version or
    /// any subfolder still lives there; the root cannot be removed.
    pub fn remove_folder(&self, caller: &str, folder_path: &str) -> Result<()> {
        validate_principal(caller)?;
        self.limiter.admit(caller, OpClass::Request)?;
        let folder = normalize_folder_path(folder_path)?;
        if !self.ledger.snapshots_in_folder(&folder).is_empty() {
            return Err(DepotError::FolderNotEmpty(folder));
        }
        self.namespace.remove_folder(&folder)?;
        info!("removed folder {}", folder);
        Ok(())
    }

    /// Case-insensitive substring search over file names and contents.
    /// Results keep first-indexed order and are filtered to files the
    /// caller may read.
    pub fn search(&self, caller: &str, term: &str) -> Result<Vec<String>> {
        validate_principal(caller)?;
        self.limiter.admit(caller, OpClass::Request)?;

        Ok(self
            .search
            .query(term)
            .into_iter()
            .filter(|name| {
                self.ledger
                    .owner(name)
                    .map(|owner| self.acl.is_authorized(name, caller, &owner))
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Grant `principal` read access to a file. Owner-only; granting to
    /// the owner or re-granting is a no-op success.
    pub fn share(&self, caller: &str, name: &str, principal: &str) -> Result<()> {
        validate_principal(caller)?;
        self.limiter.admit(caller, OpClass::Request)?;
        validate_file_name(name)?;
        validate_principal(principal)?;
        let owner = self.require_owner(name, caller)?;

        if principal != owner && self.acl.share(name, principal) {
            info!("{} shared {} with {}", caller, name, principal);
        }
        Ok(())
    }

    /// Revoke a grant. Owner-only; revoking an absent grant is a no-op
    /// success.
    pub fn revoke(&self, caller: &str, name: &str, principal: &str) -> Result<()> {
        validate_principal(caller)?;
        self.limiter.admit(caller, OpClass::Request)?;
        validate_file_name(name)?;
        validate_principal(principal)?;
        self.require_owner(name, caller)?;

        if self.acl.revoke(name, principal) {
            info!("{} revoked {} from {}", caller, principal, name);
        }
        Ok(())
    }

    /// Whether `principal` may read `name` (owner or active grant).
    /// Unknown names are never authorized.
    pub fn is_authorized(&self, name: &str, principal: &str) -> bool {
        self.ledger
            .owner(name)
            .map(|owner| self.acl.is_authorized(name, principal, &owner))
            .unwrap_or(false)
    }

    /// Active grants on a file. Owner-only.
    pub fn grants(&self, caller: &str, name: &str) -> Result<Vec<AclGrant>> {
        validate_principal(caller)?;
        self.limiter.admit(caller, OpClass::Request)?;
        validate_file_name(name)?;
        self.require_owner(name, caller)?;
        Ok(self.acl.grants(name))
    }

    /// Derived record for a file's current state.
    pub fn metadata(&self, caller: &str, name: &str) -> Result<FileRecord> {
        validate_principal(caller)?;
        self.limiter.admit(caller, OpClass::Request)?;
        validate_file_name(name)?;
        self.authorize_read(name, caller)?;

        let snapshot = self.ledger.snapshot(name)?;
        Ok(FileRecord {
            file_name: name.to_string(),
            folder_path: snapshot.latest.folder_path.clone(),
            owner: snapshot.owner,
            latest_version: snapshot.version_count,
            size: self
                .content
                .size_of(&snapshot.latest.content_hash)
                .unwrap_or(0),
            created_at: snapshot.first_created_at,
            modified_at: snapshot.latest.created_at,
        })
    }

    /// Point-in-time counters across every component.
    pub fn stats(&self) -> DepotStats {
        DepotStats {
            files: self.ledger.file_count(),
            folders: self.namespace.folder_count(),
            blobs: self.content.blob_count(),
            search_docs: self.search.doc_count(),
            cache_hits: self.cache.hits(),
            cache_misses: self.cache.misses(),
        }
    }

    /// Reset every component to its initial state. Intended for tests;
    /// there are no implicit resets anywhere else.
    pub fn clear(&self) {
        self.ledger.clear();
        self.content.clear();
        self.namespace.clear();
        self.acl.clear();
        self.search.clear();
        self.cache.clear();
        self.limiter.clear();
        info!("cleared all depot state");
    }

    fn authorize_read(&self, name: &str, caller: &str) -> Result<String> {
        let owner = self
            .ledger
            .owner(name)
            .ok_or_else(|| DepotError::FileNotFound(name.to_string()))?;
        if !self.acl.is_authorized(name, caller, &owner) {
            return Err(DepotError::Unauthorized {
                name: name.to_string(),
                principal: caller.to_string(),
            });
        }
        Ok(owner)
    }

    fn require_owner(&self, name: &str, caller: &str) -> Result<String> {
        let owner = self
            .ledger
            .owner(name)
            .ok_or_else(|| DepotError::FileNotFound(name.to_string()))?;
        if owner != caller {
            return Err(DepotError::Unauthorized {
                name: name.to_string(),
                principal: caller.to_string(),
            });
        }
        Ok(owner)
    }
}

impl Default for Depot {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for customizing depot creation
///
/// # Examples
///
/// ```rust
/// use depot_rs::DepotBuilder;
/// use std::time::Duration;
///
/// let depot = DepotBuilder::new()
///     .cache_ttl(Duration::from_secs(60))
///     .cache_capacity(256)
///     .build();
/// # drop(depot);
/// ```
pub struct DepotBuilder {
    cache_capacity: usize,
    cache_ttl: Duration,
    rate_limits: RateLimiterConfig,
    backend_timeout: Duration,
    blob_backend: Option<Arc<dyn BlobBackend>>,
    ownership_backend: Option<Arc<dyn OwnershipBackend>>,
}

impl DepotBuilder {
    pub fn new() -> Self {
        DepotBuilder {
            cache_capacity: 1024,
            cache_ttl: Duration::from_secs(600),
            rate_limits: RateLimiterConfig::default(),
            backend_timeout: Duration::from_secs(5),
            blob_backend: None,
            ownership_backend: None,
        }
    }

    /// How long cached reads stay valid absent explicit invalidation
    /// (default 600 s).
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Maximum number of cached reads (default 1024).
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Admission quotas per client identity.
    pub fn rate_limits(mut self, config: RateLimiterConfig) -> Self {
        self.rate_limits = config;
        self
    }

    /// Timeout handed to every blob/ownership backend call (default 5 s).
    pub fn backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    /// Use a custom content-addressed blob backend.
    pub fn blob_backend(mut self, backend: Arc<dyn BlobBackend>) -> Self {
        self.blob_backend = Some(backend);
        self
    }

    /// Use a custom ownership ledger backend.
    pub fn ownership_backend(mut self, backend: Arc<dyn OwnershipBackend>) -> Self {
        self.ownership_backend = Some(backend);
        self
    }

    /// Build the depot. Backends default to the in-memory implementations.
    pub fn build(self) -> Depot {
        let blob: Arc<dyn BlobBackend> = match self.blob_backend {
            Some(backend) => backend,
            None => Arc::new(MemoryBlobStore::new()),
        };
        let ownership: Arc<dyn OwnershipBackend> = match self.ownership_backend {
            Some(backend) => backend,
            None => Arc::new(MemoryOwnershipLog::new()),
        };
        info!(
            "building depot (cache {} entries / {:?} ttl, {} req per {:?}, {} uploads per {:?})",
            self.cache_capacity,
            self.cache_ttl,
            self.rate_limits.max_requests,
            self.rate_limits.request_window,
            self.rate_limits.max_uploads,
            self.rate_limits.upload_window
        );
        Depot {
            content: ContentStore::new(blob, self.backend_timeout),
            ledger: VersionLedger::new(ownership, self.backend_timeout),
            namespace: NamespaceTree::new(),
            acl: AccessControl::new(),
            search: SearchIndex::new(),
            cache: CacheLayer::new(self.cache_capacity, self.cache_ttl),
            limiter: RateLimiter::new(self.rate_limits),
        }
    }
}

impl Default for DepotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
