//! Core engine for the depot: content-addressed storage, version history,
//! folder namespace, access control, search, caching, and admission control.
//!
//! Each submodule owns one concern and its own interior locking, so a
//! shared [`Depot`](crate::Depot) handle serves concurrent request
//! handlers without any external synchronization.

pub mod acl;
pub mod backend;
pub mod cache;
pub mod content_store;
pub mod ledger;
pub mod namespace;
pub mod rate_limit;
pub mod search;
pub mod validation;
