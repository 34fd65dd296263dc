//! Folder hierarchy for the file namespace
//!
//! Folders are identified by canonical slash-delimited paths ending in `/`;
//! the root `/` always exists. Creation is idempotent and fills in missing
//! ancestors, so concurrent identical requests both succeed.

use crate::core::validation::normalize_folder_path;
use crate::error::{DepotError, Result};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A folder record in the namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Canonical path, e.g. `/docs/reports/`
    pub path: String,

    /// Parent path, `None` for the root
    pub parent_path: Option<String>,

    /// When the folder was first created
    pub created_at: DateTime<Utc>,
}

/// Hierarchical folder namespace
pub struct NamespaceTree {
    folders: RwLock<AHashMap<String, Folder>>,
}

impl NamespaceTree {
    pub fn new() -> Self {
        let tree = NamespaceTree {
            folders: RwLock::new(AHashMap::new()),
        };
        tree.insert_root();
        tree
    }

    fn insert_root(&self) {
        self.folders.write().insert(
            "/".to_string(),
            Folder {
                path: "/".to_string(),
                parent_path: None,
                created_at: Utc::now(),
            },
        );
    }

    /// Create a folder and all missing ancestors, returning the canonical
    /// path. Re-creating an existing folder is a no-op success.
    pub fn ensure_folder(&self, path: &str) -> Result<String> {
        let canonical = normalize_folder_path(path)?;
        if canonical == "/" {
            return Ok(canonical);
        }

        let mut folders = self.folders.write();
        let mut prefix = String::from("/");
        for segment in canonical.trim_matches('/').split('/') {
            let parent = prefix.clone();
            prefix.push_str(segment);
            prefix.push('/');
            if !folders.contains_key(&prefix) {
                debug!("creating folder {}", prefix);
                folders.insert(
                    prefix.clone(),
                    Folder {
                        path: prefix.clone(),
                        parent_path: Some(parent),
                        created_at: Utc::now(),
                    },
                );
            }
        }
        Ok(canonical)
    }

    /// Whether a canonical folder path exists.
    pub fn exists(&self, canonical_path: &str) -> bool {
        self.folders.read().contains_key(canonical_path)
    }

    /// Direct child folders of a canonical path, sorted by path.
    pub fn child_folders(&self, canonical_path: &str) -> Vec<Folder> {
        let folders = self.folders.read();
        let mut children: Vec<Folder> = folders
            .values()
            .filter(|folder| folder.parent_path.as_deref() == Some(canonical_path))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.path.cmp(&b.path));
        children
    }

    /// Remove an empty folder.
    ///
    /// Fails when the folder still has subfolders; whether it still holds
    /// files is the caller's check, since files live in the version ledger.
    /// The root cannot be removed.
    pub fn remove_folder(&self, path: &str) -> Result<()> {
        let canonical = normalize_folder_path(path)?;
        if canonical == "/" {
            return Err(DepotError::RootFolderImmutable);
        }

        let mut folders = self.folders.write();
        if !folders.contains_key(&canonical) {
            return Err(DepotError::FolderNotFound(canonical));
        }
        let has_children = folders
            .values()
            .any(|folder| folder.parent_path.as_deref() == Some(canonical.as_str()));
        if has_children {
            return Err(DepotError::FolderNotEmpty(canonical));
        }
        folders.remove(&canonical);
        debug!("removed folder {}", canonical);
        Ok(())
    }

    /// Number of folders, root included.
    pub fn folder_count(&self) -> usize {
        self.folders.read().len()
    }

    /// Reset to just the root. Test-reset hook.
    pub fn clear(&self) {
        self.folders.write().clear();
        self.insert_root();
    }
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self::new()
    }
}
