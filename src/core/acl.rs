//! Per-file access grants
//!
//! A grant list per file name records which principals may read the file
//! beyond its owner. The owner is implicitly authorized and never appears
//! in the list; ownership itself lives in the version ledger, so the
//! owner-gating of mutations happens above this layer.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One active grant on a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclGrant {
    pub principal: String,
    pub granted_at: DateTime<Utc>,
}

/// Grant lists for all files
pub struct AccessControl {
    grants: RwLock<AHashMap<String, Vec<AclGrant>>>,
}

impl AccessControl {
    pub fn new() -> Self {
        AccessControl {
            grants: RwLock::new(AHashMap::new()),
        }
    }

    /// Grant `principal` read access to `name`.
    ///
    /// Returns `true` when the grant is new; re-granting is a no-op
    /// success and keeps the original timestamp.
    pub fn share(&self, name: &str, principal: &str) -> bool {
        let mut grants = self.grants.write();
        let list = grants.entry(name.to_string()).or_default();
        if list.iter().any(|grant| grant.principal == principal) {
            return false;
        }
        list.push(AclGrant {
            principal: principal.to_string(),
            granted_at: Utc::now(),
        });
        debug!("granted {} access to {}", principal, name);
        true
    }

    /// Remove a grant. Revoking an absent grant is a no-op success;
    /// returns `true` when a grant was actually removed.
    pub fn revoke(&self, name: &str, principal: &str) -> bool {
        let mut grants = self.grants.write();
        let Some(list) = grants.get_mut(name) else {
            return false;
        };
        let before = list.len();
        list.retain(|grant| grant.principal != principal);
        let removed = list.len() != before;
        if list.is_empty() {
            grants.remove(name);
        }
        if removed {
            debug!("revoked {} access to {}", principal, name);
        }
        removed
    }

    /// Whether `principal` may read `name`, given the file's owner.
    pub fn is_authorized(&self, name: &str, principal: &str, owner: &str) -> bool {
        if principal == owner {
            return true;
        }
        self.grants
            .read()
            .get(name)
            .is_some_and(|list| list.iter().any(|grant| grant.principal == principal))
    }

    /// Active grants on a file, in grant order.
    pub fn grants(&self, name: &str) -> Vec<AclGrant> {
        self.grants.read().get(name).cloned().unwrap_or_default()
    }

    /// Drop every grant for a file (file deletion).
    pub fn remove_all(&self, name: &str) {
        self.grants.write().remove(name);
    }

    /// Total number of files with at least one grant.
    pub fn granted_file_count(&self) -> usize {
        self.grants.read().len()
    }

    /// Test-reset hook.
    pub fn clear(&self) {
        self.grants.write().clear();
    }
}

impl Default for AccessControl {
    fn default() -> Self {
        Self::new()
    }
}
