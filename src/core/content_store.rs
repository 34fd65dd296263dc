//! Content-addressed blob bookkeeping with reference counting
//!
//! The store owns the hash-to-refcount map and deduplication guarantee;
//! the bytes themselves live behind the [`BlobBackend`]. A hash is readable
//! while its refcount is above zero and purged the moment it reaches zero.

use crate::core::backend::{BackendError, BlobBackend};
use crate::error::{DepotError, Result};
use ahash::AHashMap;
use parking_lot::RwLock;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// SHA-256 content address of a byte sequence.
///
/// Displays and serializes as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Digest a byte sequence into its content address.
    pub fn digest(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        ContentHash(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in &self.0 {
            use fmt::Write;
            write!(out, "{:02x}", byte).expect("writing to a String cannot fail");
        }
        out
    }

    /// Parse a 64-character hex string back into a hash.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 64 {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let high = (chunk[0] as char).to_digit(16)?;
            let low = (chunk[1] as char).to_digit(16)?;
            bytes[i] = ((high << 4) | low) as u8;
        }
        Some(ContentHash(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}..)", &self.to_hex()[..8])
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        ContentHash::from_hex(&hex)
            .ok_or_else(|| D::Error::custom(format!("invalid content hash '{}'", hex)))
    }
}

struct Blob {
    size: u64,
    refcount: AtomicU64,
}

/// Content-addressed store with per-hash reference counts.
///
/// Identical bytes are never stored twice: a repeated `put` increments the
/// existing refcount. Refcount mutations are atomic per hash and independent
/// of any per-name serialization above this layer.
pub struct ContentStore {
    blobs: RwLock<AHashMap<ContentHash, Blob>>,
    backend: Arc<dyn BlobBackend>,
    backend_timeout: Duration,
}

impl ContentStore {
    pub fn new(backend: Arc<dyn BlobBackend>, backend_timeout: Duration) -> Self {
        ContentStore {
            blobs: RwLock::new(AHashMap::new()),
            backend,
            backend_timeout,
        }
    }

    /// Store a byte sequence, returning its content address.
    ///
    /// Bytes already present gain one reference; novel bytes are handed to
    /// the blob backend and start at refcount 1.
    pub fn put(&self, bytes: &[u8]) -> Result<ContentHash> {
        let hash = ContentHash::digest(bytes);

        {
            let blobs = self.blobs.read();
            if let Some(blob) = blobs.get(&hash) {
                blob.refcount.fetch_add(1, Ordering::SeqCst);
                debug!("deduplicated put of {} bytes as {}", bytes.len(), hash);
                return Ok(hash);
            }
        }

        // Novel bytes (or a put racing a purge): upload outside the lock,
        // then insert. Backend puts are idempotent by content address.
        let stored = self.backend.put(bytes, self.backend_timeout)?;
        if stored != hash {
            return Err(DepotError::BackendUnavailable(format!(
                "blob backend returned mismatched content id {} for {}",
                stored, hash
            )));
        }

        let mut blobs = self.blobs.write();
        blobs
            .entry(hash)
            .and_modify(|blob| {
                blob.refcount.fetch_add(1, Ordering::SeqCst);
            })
            .or_insert_with(|| Blob {
                size: bytes.len() as u64,
                refcount: AtomicU64::new(1),
            });
        debug!("stored {} bytes as {}", bytes.len(), hash);
        Ok(hash)
    }

    /// Fetch the bytes for a live content address.
    pub fn get(&self, hash: &ContentHash) -> Result<Vec<u8>> {
        if !self.blobs.read().contains_key(hash) {
            return Err(DepotError::BlobNotFound(hash.to_hex()));
        }
        self.backend
            .get(hash, self.backend_timeout)
            .map_err(|err| match err {
                BackendError::Missing(_) => DepotError::BlobNotFound(hash.to_hex()),
                other => other.into(),
            })
    }

    /// Add a reference to an already-stored hash (used by revert, which
    /// reuses a historical version's bytes without re-uploading them).
    pub fn inc_ref(&self, hash: &ContentHash) -> Result<()> {
        let blobs = self.blobs.read();
        let blob = blobs
            .get(hash)
            .ok_or_else(|| DepotError::BlobNotFound(hash.to_hex()))?;
        blob.refcount.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Drop one reference; at zero the blob is purged and the backend told
    /// to forget it.
    pub fn dec_ref(&self, hash: &ContentHash) -> Result<()> {
        {
            let blobs = self.blobs.read();
            let blob = blobs
                .get(hash)
                .ok_or_else(|| DepotError::BlobNotFound(hash.to_hex()))?;
            if blob.refcount.fetch_sub(1, Ordering::SeqCst) > 1 {
                return Ok(());
            }
        }

        // Fell to zero: purge under the write lock, re-checking the count
        // in case a concurrent put revived the hash in between.
        let purged = {
            let mut blobs = self.blobs.write();
            match blobs.get(hash) {
                Some(blob) if blob.refcount.load(Ordering::SeqCst) == 0 => {
                    blobs.remove(hash);
                    true
                }
                _ => false,
            }
        };

        if purged {
            debug!("purging unreferenced blob {}", hash);
            if let Err(err) = self.backend.forget(hash, self.backend_timeout) {
                warn!("blob backend failed to forget {}: {}", hash, err);
            }
        }
        Ok(())
    }

    /// Size in bytes of a live blob.
    pub fn size_of(&self, hash: &ContentHash) -> Option<u64> {
        self.blobs.read().get(hash).map(|blob| blob.size)
    }

    /// Current refcount of a hash, `None` once purged.
    pub fn refcount(&self, hash: &ContentHash) -> Option<u64> {
        self.blobs
            .read()
            .get(hash)
            .map(|blob| blob.refcount.load(Ordering::SeqCst))
    }

    /// Number of distinct blobs currently referenced.
    pub fn blob_count(&self) -> usize {
        self.blobs.read().len()
    }

    /// Drop every blob. Test-reset hook; the backend is asked to forget
    /// each purged hash.
    pub fn clear(&self) {
        let hashes: Vec<ContentHash> = {
            let mut blobs = self.blobs.write();
            let hashes = blobs.keys().copied().collect();
            blobs.clear();
            hashes
        };
        for hash in hashes {
            let _ = self.backend.forget(&hash, self.backend_timeout);
        }
    }
}
