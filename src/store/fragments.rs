//! Fragment persistence: capture, thread walks, and the processed flag.
//!
//! Fragments form a parent-pointer forest. [`ancestor_chain`] walks from a
//! fragment up to its root (returned root-first); [`children`] is a plain
//! index scan on `parent_id`.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{InsightError, Result};
use crate::store::now_rfc3339;
use crate::store::types::Fragment;

fn row_to_fragment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Fragment> {
    Ok(Fragment {
        id: row.get(0)?,
        content: row.get(1)?,
        url: row.get(2)?,
        image_path: row.get(3)?,
        processed: row.get(4)?,
        parent_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const FRAGMENT_COLUMNS: &str =
    "id, content, url, image_path, processed, parent_id, created_at, updated_at";

/// Insert a new fragment. When `parent_id` is given the parent must already
/// exist — replies can only be attached to persisted fragments.
pub fn insert_fragment(
    conn: &Connection,
    content: &str,
    url: Option<&str>,
    image_path: Option<&str>,
    parent_id: Option<i64>,
) -> Result<Fragment> {
    if let Some(pid) = parent_id {
        // Validate the parent before inserting so the error names the id
        get_fragment(conn, pid)?;
    }

    let now = now_rfc3339();
    conn.execute(
        "INSERT INTO fragments (content, url, image_path, processed, parent_id, created_at, updated_at) \
         VALUES (?1, ?2, ?3, 0, ?4, ?5, ?5)",
        params![content, url, image_path, parent_id, now],
    )?;

    get_fragment(conn, conn.last_insert_rowid())
}

/// Fetch a fragment by id.
pub fn get_fragment(conn: &Connection, id: i64) -> Result<Fragment> {
    conn.query_row(
        &format!("SELECT {FRAGMENT_COLUMNS} FROM fragments WHERE id = ?1"),
        params![id],
        row_to_fragment,
    )
    .optional()?
    .ok_or(InsightError::FragmentNotFound(id))
}

/// All direct children of a fragment, in persisted (id) order.
pub fn children(conn: &Connection, parent_id: i64) -> Result<Vec<Fragment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FRAGMENT_COLUMNS} FROM fragments WHERE parent_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt
        .query_map(params![parent_id], row_to_fragment)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Walk the parent chain from `id` to its root. Returns the chain ordered
/// root-first with the requested fragment last.
pub fn ancestor_chain(conn: &Connection, id: i64) -> Result<Vec<Fragment>> {
    let mut chain = Vec::new();
    let mut current = Some(id);

    while let Some(cid) = current {
        let fragment = get_fragment(conn, cid)?;
        current = fragment.parent_id;
        chain.push(fragment);
    }

    chain.reverse();
    Ok(chain)
}

/// Mark a fragment as consolidated into a document.
pub fn mark_processed(conn: &Connection, id: i64) -> Result<()> {
    let now = now_rfc3339();
    let rows = conn.execute(
        "UPDATE fragments SET processed = 1, updated_at = ?1 WHERE id = ?2",
        params![now, id],
    )?;
    if rows == 0 {
        return Err(InsightError::FragmentNotFound(id));
    }
    Ok(())
}

/// Fragments that have not been linked to any document yet.
pub fn list_unprocessed(conn: &Connection) -> Result<Vec<Fragment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FRAGMENT_COLUMNS} FROM fragments \
         WHERE id NOT IN (SELECT fragment_id FROM fragment_documents) \
         ORDER BY id"
    ))?;
    let rows = stmt
        .query_map([], row_to_fragment)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        crate::db::schema::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_and_get_fragment() {
        let conn = test_db();
        let fragment = insert_fragment(&conn, "hello", Some("https://example.com"), None, None)
            .unwrap();

        assert_eq!(fragment.content, "hello");
        assert_eq!(fragment.url.as_deref(), Some("https://example.com"));
        assert!(!fragment.processed);
        assert!(fragment.parent_id.is_none());

        let fetched = get_fragment(&conn, fragment.id).unwrap();
        assert_eq!(fetched.id, fragment.id);
        assert_eq!(fetched.content, "hello");
    }

    #[test]
    fn get_missing_fragment_is_not_found() {
        let conn = test_db();
        let err = get_fragment(&conn, 999).unwrap_err();
        assert!(matches!(err, InsightError::FragmentNotFound(999)));
    }

    #[test]
    fn insert_with_missing_parent_fails() {
        let conn = test_db();
        let err = insert_fragment(&conn, "reply", None, None, Some(42)).unwrap_err();
        assert!(matches!(err, InsightError::FragmentNotFound(42)));
    }

    #[test]
    fn ancestor_chain_is_root_first() {
        let conn = test_db();
        let root = insert_fragment(&conn, "root", None, None, None).unwrap();
        let mid = insert_fragment(&conn, "mid", None, None, Some(root.id)).unwrap();
        let leaf = insert_fragment(&conn, "leaf", None, None, Some(mid.id)).unwrap();

        let chain = ancestor_chain(&conn, leaf.id).unwrap();
        let ids: Vec<i64> = chain.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![root.id, mid.id, leaf.id]);
    }

    #[test]
    fn ancestor_chain_of_root_is_single() {
        let conn = test_db();
        let root = insert_fragment(&conn, "root", None, None, None).unwrap();
        let chain = ancestor_chain(&conn, root.id).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].id, root.id);
    }

    #[test]
    fn children_returns_direct_replies_in_id_order() {
        let conn = test_db();
        let root = insert_fragment(&conn, "root", None, None, None).unwrap();
        let a = insert_fragment(&conn, "a", None, None, Some(root.id)).unwrap();
        let b = insert_fragment(&conn, "b", None, None, Some(root.id)).unwrap();
        // grandchild is not a direct child of root
        insert_fragment(&conn, "nested", None, None, Some(a.id)).unwrap();

        let kids = children(&conn, root.id).unwrap();
        let ids: Vec<i64> = kids.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[test]
    fn mark_processed_sets_flag() {
        let conn = test_db();
        let fragment = insert_fragment(&conn, "note", None, None, None).unwrap();

        mark_processed(&conn, fragment.id).unwrap();
        assert!(get_fragment(&conn, fragment.id).unwrap().processed);

        let err = mark_processed(&conn, 123).unwrap_err();
        assert!(matches!(err, InsightError::FragmentNotFound(123)));
    }

    #[test]
    fn list_unprocessed_excludes_linked_fragments() {
        let conn = test_db();
        let linked = insert_fragment(&conn, "linked", None, None, None).unwrap();
        let loose = insert_fragment(&conn, "loose", None, None, None).unwrap();

        let doc =
            crate::store::documents::insert_document(&conn, "Doc", "body", "sum").unwrap();
        crate::store::documents::link_fragment(&conn, doc.id, linked.id).unwrap();

        let unprocessed = list_unprocessed(&conn).unwrap();
        let ids: Vec<i64> = unprocessed.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![loose.id]);
    }
}
