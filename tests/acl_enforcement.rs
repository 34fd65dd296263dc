//! Ownership and grant enforcement across the request surface

use depot_rs::{Depot, DepotError, ErrorKind};

fn seeded_depot() -> Depot {
    let depot = Depot::new();
    depot
        .upload("alice", "secret.txt", b"owner eyes only", "/vault/")
        .unwrap();
    depot
}

#[test]
fn test_share_revoke_scenario() {
    let depot = seeded_depot();

    // A non-owner cannot share or revoke someone else's file.
    assert_eq!(
        depot.share("eve", "secret.txt", "eve").unwrap_err().kind(),
        ErrorKind::Unauthorized
    );
    assert_eq!(
        depot.revoke("eve", "secret.txt", "bob").unwrap_err().kind(),
        ErrorKind::Unauthorized
    );

    // Owner grants, principal gains read access.
    depot.share("alice", "secret.txt", "bob").unwrap();
    assert!(depot.is_authorized("secret.txt", "bob"));
    let file = depot.get_file("bob", "secret.txt", None).unwrap();
    assert_eq!(file.bytes, b"owner eyes only");

    // Revoked, access is gone again.
    depot.revoke("alice", "secret.txt", "bob").unwrap();
    assert!(!depot.is_authorized("secret.txt", "bob"));
    assert_eq!(
        depot.get_file("bob", "secret.txt", None).unwrap_err().kind(),
        ErrorKind::Unauthorized
    );
}

#[test]
fn test_owner_is_always_authorized() {
    let depot = seeded_depot();
    assert!(depot.is_authorized("secret.txt", "alice"));

    // Sharing with the owner is a no-op: no grant record appears.
    depot.share("alice", "secret.txt", "alice").unwrap();
    assert!(depot.grants("alice", "secret.txt").unwrap().is_empty());
}

#[test]
fn test_revoking_absent_grant_is_noop_success() {
    let depot = seeded_depot();
    depot.revoke("alice", "secret.txt", "never-granted").unwrap();
}

#[test]
fn test_grants_listing_is_owner_only() {
    let depot = seeded_depot();
    depot.share("alice", "secret.txt", "bob").unwrap();
    depot.share("alice", "secret.txt", "carol").unwrap();

    let grants = depot.grants("alice", "secret.txt").unwrap();
    let principals: Vec<&str> = grants.iter().map(|g| g.principal.as_str()).collect();
    assert_eq!(principals, vec!["bob", "carol"]);

    assert_eq!(
        depot.grants("bob", "secret.txt").unwrap_err().kind(),
        ErrorKind::Unauthorized
    );
}

#[test]
fn test_non_owner_mutations_are_rejected() {
    let depot = seeded_depot();
    depot.share("alice", "secret.txt", "bob").unwrap();

    // A grant is read access, not write access.
    assert_eq!(
        depot
            .upload("bob", "secret.txt", b"overwrite", "/vault/")
            .unwrap_err()
            .kind(),
        ErrorKind::Unauthorized
    );
    assert_eq!(
        depot.revert("bob", "secret.txt", 1).unwrap_err().kind(),
        ErrorKind::Unauthorized
    );
    assert_eq!(
        depot.delete_file("bob", "secret.txt").unwrap_err().kind(),
        ErrorKind::Unauthorized
    );

    // Nothing changed.
    let file = depot.get_file("alice", "secret.txt", None).unwrap();
    assert_eq!(file.bytes, b"owner eyes only");
    assert_eq!(file.latest_version, 1);
}

#[test]
fn test_failed_overwrite_leaks_no_blob() {
    let depot = seeded_depot();
    let before = depot.stats().blobs;

    let err = depot
        .upload("eve", "secret.txt", b"intruder bytes", "/vault/")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    // The rejected append rolled its content reference back.
    assert_eq!(depot.stats().blobs, before);
}

#[test]
fn test_search_reveals_only_readable_files() {
    let depot = Depot::new();
    depot.upload("alice", "alice-notes.txt", b"project kraken", "/").unwrap();
    depot.upload("bob", "bob-notes.txt", b"project kraken", "/").unwrap();

    // Each owner sees their own file only.
    assert_eq!(
        depot.search("alice", "kraken").unwrap(),
        vec!["alice-notes.txt"]
    );
    assert_eq!(depot.search("bob", "kraken").unwrap(), vec!["bob-notes.txt"]);

    // A grant widens the result set.
    depot.share("alice", "alice-notes.txt", "bob").unwrap();
    assert_eq!(
        depot.search("bob", "kraken").unwrap(),
        vec!["alice-notes.txt", "bob-notes.txt"]
    );

    // A stranger sees nothing.
    assert!(depot.search("mallory", "kraken").unwrap().is_empty());
}

#[test]
fn test_history_and_metadata_respect_grants() {
    let depot = seeded_depot();

    assert_eq!(
        depot.history("bob", "secret.txt").unwrap_err().kind(),
        ErrorKind::Unauthorized
    );
    assert_eq!(
        depot.metadata("bob", "secret.txt").unwrap_err().kind(),
        ErrorKind::Unauthorized
    );

    depot.share("alice", "secret.txt", "bob").unwrap();
    assert_eq!(depot.history("bob", "secret.txt").unwrap().len(), 1);
    assert_eq!(depot.metadata("bob", "secret.txt").unwrap().owner, "alice");
}

#[test]
fn test_unknown_file_reports_not_found_not_unauthorized() {
    let depot = Depot::new();
    assert!(matches!(
        depot.share("alice", "ghost.txt", "bob"),
        Err(DepotError::FileNotFound(_))
    ));
    assert!(!depot.is_authorized("ghost.txt", "alice"));
}

#[test]
fn test_malformed_principal_is_rejected() {
    let depot = seeded_depot();
    assert_eq!(
        depot
            .share("alice", "secret.txt", "not a principal")
            .unwrap_err()
            .kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        depot.get_file("", "secret.txt", None).unwrap_err().kind(),
        ErrorKind::Validation
    );
}
