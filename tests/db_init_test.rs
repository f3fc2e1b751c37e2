mod helpers;

use insight::db::{self, migrations};
use insight::store::fragments;

#[test]
fn open_database_creates_file_and_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("insight.db");

    let conn = db::open_database(&path).unwrap();
    assert!(path.exists(), "database file should be created");

    let version = migrations::get_schema_version(&conn).unwrap();
    assert_eq!(version, migrations::CURRENT_SCHEMA_VERSION);
}

#[test]
fn reopen_preserves_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("insight.db");

    let id = {
        let conn = db::open_database(&path).unwrap();
        fragments::insert_fragment(&conn, "survives reopen", None, None, None)
            .unwrap()
            .id
    };

    let conn = db::open_database(&path).unwrap();
    let fragment = fragments::get_fragment(&conn, id).unwrap();
    assert_eq!(fragment.content, "survives reopen");
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = helpers::test_db();
    // Linking a fragment to a nonexistent document must be rejected
    let result = conn.execute(
        "INSERT INTO fragment_documents (fragment_id, document_id) VALUES (1, 999)",
        [],
    );
    assert!(result.is_err());
}
