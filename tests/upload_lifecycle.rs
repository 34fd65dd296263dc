//! End-to-end upload / read / revert / search / delete flows

use depot_rs::{Depot, ErrorKind};

#[test]
fn test_notes_scenario() {
    let depot = Depot::new();

    let r1 = depot.upload("alice", "notes.txt", b"abc", "/").unwrap();
    assert_eq!(r1.version, 1);

    let r2 = depot.upload("alice", "notes.txt", b"abcd", "/").unwrap();
    assert_eq!(r2.version, 2);
    assert_ne!(r1.content_hash, r2.content_hash);

    let history = depot.history("alice", "notes.txt").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version, 1);
    assert_eq!(history[0].content_hash, r1.content_hash);
    assert_eq!(history[1].version, 2);
    assert_eq!(history[1].content_hash, r2.content_hash);

    // Revert appends a new version pointing at version 1's content.
    let v3 = depot.revert("alice", "notes.txt", 1).unwrap();
    assert_eq!(v3, 3);

    let latest = depot.get_file("alice", "notes.txt", None).unwrap();
    assert_eq!(latest.bytes, b"abc");
    assert_eq!(latest.version, 3);
    assert_eq!(latest.latest_version, 3);

    // Versions 1 and 2 are still retrievable, unchanged.
    let v1 = depot.get_file("alice", "notes.txt", Some(1)).unwrap();
    assert_eq!(v1.bytes, b"abc");
    let v2 = depot.get_file("alice", "notes.txt", Some(2)).unwrap();
    assert_eq!(v2.bytes, b"abcd");
}

#[test]
fn test_search_scenario() {
    let depot = Depot::new();
    depot.upload("alice", "notes.txt", b"abc", "/").unwrap();
    depot.upload("alice", "notes.txt", b"abcd", "/").unwrap();
    depot.revert("alice", "notes.txt", 1).unwrap();

    // Content match
    assert_eq!(depot.search("alice", "abc").unwrap(), vec!["notes.txt"]);
    // Name match
    assert_eq!(depot.search("alice", "notes").unwrap(), vec!["notes.txt"]);
    // No match
    assert!(depot.search("alice", "xyz").unwrap().is_empty());
}

#[test]
fn test_search_tracks_latest_content() {
    let depot = Depot::new();
    depot.upload("alice", "doc.txt", b"first draft", "/").unwrap();
    depot.upload("alice", "doc.txt", b"final text", "/").unwrap();

    // The document is replaced, not appended: old content stops matching.
    assert!(depot.search("alice", "first").unwrap().is_empty());
    assert_eq!(depot.search("alice", "final").unwrap(), vec!["doc.txt"]);

    // Reverting re-indexes the restored content.
    depot.revert("alice", "doc.txt", 1).unwrap();
    assert_eq!(depot.search("alice", "first").unwrap(), vec!["doc.txt"]);
    assert!(depot.search("alice", "final").unwrap().is_empty());
}

#[test]
fn test_delete_removes_every_trace() {
    let depot = Depot::new();
    depot.upload("alice", "a.txt", b"payload", "/docs/").unwrap();
    depot.upload("alice", "a.txt", b"payload v2", "/docs/").unwrap();
    depot.share("alice", "a.txt", "bob").unwrap();

    depot.delete_file("alice", "a.txt").unwrap();

    assert_eq!(
        depot.get_file("alice", "a.txt", None).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        depot.get_file("alice", "a.txt", Some(1)).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        depot.history("alice", "a.txt").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(depot.search("alice", "payload").unwrap().is_empty());
    assert!(!depot.is_authorized("a.txt", "bob"));

    let stats = depot.stats();
    assert_eq!(stats.files, 0);
    assert_eq!(stats.blobs, 0);
    assert_eq!(stats.search_docs, 0);

    // The folder survives the file.
    assert!(depot.list("alice", "/docs/").unwrap().is_empty());
}

#[test]
fn test_recreate_after_delete_starts_at_version_one() {
    let depot = Depot::new();
    depot.upload("alice", "a.txt", b"one", "/").unwrap();
    depot.upload("alice", "a.txt", b"two", "/").unwrap();
    depot.delete_file("alice", "a.txt").unwrap();

    let receipt = depot.upload("bob", "a.txt", b"fresh", "/").unwrap();
    assert_eq!(receipt.version, 1);
    let file = depot.get_file("bob", "a.txt", None).unwrap();
    assert_eq!(file.latest_version, 1);
}

#[test]
fn test_folder_lifecycle() {
    let depot = Depot::new();

    // Idempotent creation, canonical result either way.
    assert_eq!(depot.create_folder("alice", "docs").unwrap(), "/docs/");
    assert_eq!(depot.create_folder("alice", "/docs/").unwrap(), "/docs/");

    depot.upload("alice", "a.txt", b"x", "/docs/").unwrap();

    // Non-empty folders refuse removal.
    assert_eq!(
        depot.remove_folder("alice", "/docs/").unwrap_err().kind(),
        ErrorKind::Conflict
    );

    depot.delete_file("alice", "a.txt").unwrap();
    depot.remove_folder("alice", "/docs/").unwrap();
    assert_eq!(
        depot.list("alice", "/docs/").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_list_shows_direct_children_only() {
    let depot = Depot::new();
    depot.upload("alice", "top.txt", b"t", "/").unwrap();
    depot.upload("alice", "inner.txt", b"i", "/docs/").unwrap();
    depot.upload("alice", "deep.txt", b"d", "/docs/archive/").unwrap();

    let root = depot.list("alice", "/").unwrap();
    let names: Vec<&str> = root.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["docs", "top.txt"]);

    let docs = depot.list("alice", "/docs/").unwrap();
    let names: Vec<&str> = docs.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["archive", "inner.txt"]);
}

#[test]
fn test_metadata_reflects_latest_version() {
    let depot = Depot::new();
    depot.upload("alice", "a.txt", b"tiny", "/docs/").unwrap();
    depot.upload("alice", "a.txt", b"much longer content", "/docs/").unwrap();

    let record = depot.metadata("alice", "a.txt").unwrap();
    assert_eq!(record.file_name, "a.txt");
    assert_eq!(record.folder_path, "/docs/");
    assert_eq!(record.owner, "alice");
    assert_eq!(record.latest_version, 2);
    assert_eq!(record.size, b"much longer content".len() as u64);
    assert!(record.modified_at >= record.created_at);
}
