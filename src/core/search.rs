//! Name and content search
//!
//! One document per file name, replaced wholesale on every new version.
//! Queries are case-insensitive substring matches against the file name or
//! the lowercased content, returned in first-indexed order so results are
//! deterministic. Content is treated as lossy UTF-8; opaque (for instance
//! client-encrypted) bytes still index deterministically, they just never
//! match anything meaningful.

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Indexed view of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub file_name: String,
    pub folder_path: String,
    /// Lowercased lossy-UTF-8 rendering of the latest content
    pub content: String,
}

struct IndexInner {
    docs: AHashMap<String, SearchDocument>,
    /// First-indexed order of live names, for deterministic results
    order: Vec<String>,
}

/// Substring search over file names and contents
pub struct SearchIndex {
    inner: RwLock<IndexInner>,
}

impl SearchIndex {
    pub fn new() -> Self {
        SearchIndex {
            inner: RwLock::new(IndexInner {
                docs: AHashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Index (or re-index) a file's latest content. A re-indexed name keeps
    /// its original position in the result order.
    pub fn index(&self, name: &str, folder_path: &str, raw_bytes: &[u8]) {
        let doc = SearchDocument {
            file_name: name.to_string(),
            folder_path: folder_path.to_string(),
            content: String::from_utf8_lossy(raw_bytes).to_lowercase(),
        };
        let mut inner = self.inner.write();
        if inner.docs.insert(name.to_string(), doc).is_none() {
            inner.order.push(name.to_string());
        }
    }

    /// Drop a file's document.
    pub fn remove(&self, name: &str) {
        let mut inner = self.inner.write();
        if inner.docs.remove(name).is_some() {
            inner.order.retain(|n| n != name);
        }
    }

    /// Case-insensitive substring query over names and contents.
    ///
    /// An empty (or all-whitespace) term matches nothing.
    pub fn query(&self, term: &str) -> Vec<String> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter(|name| {
                name.to_lowercase().contains(&needle)
                    || inner
                        .docs
                        .get(name.as_str())
                        .is_some_and(|doc| doc.content.contains(&needle))
            })
            .cloned()
            .collect()
    }

    /// Current document for a name, if indexed.
    pub fn document(&self, name: &str) -> Option<SearchDocument> {
        self.inner.read().docs.get(name).cloned()
    }

    /// Number of indexed documents.
    pub fn doc_count(&self) -> usize {
        self.inner.read().docs.len()
    }

    /// Test-reset hook.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.docs.clear();
        inner.order.clear();
    }
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}
