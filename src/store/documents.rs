//! Document persistence, link tables, and the reconciliation snapshot.
//!
//! Titles are globally unique; a duplicate insert surfaces as
//! [`InsightError::DuplicateTitle`]. Both link operations validate the
//! referenced rows and are idempotent under re-insertion.

use std::collections::HashMap;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::error::{InsightError, Result};
use crate::store::now_rfc3339;
use crate::store::types::{Document, Fragment, Tag};

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        summary: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const DOCUMENT_COLUMNS: &str = "id, title, content, summary, created_at, updated_at";

/// Map a UNIQUE-constraint failure on `documents.title` to `DuplicateTitle`.
fn map_title_conflict(err: rusqlite::Error, title: &str) -> InsightError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation =>
        {
            InsightError::DuplicateTitle(title.to_string())
        }
        _ => InsightError::Db(err),
    }
}

/// Insert a new document.
pub fn insert_document(
    conn: &Connection,
    title: &str,
    content: &str,
    summary: &str,
) -> Result<Document> {
    let now = now_rfc3339();
    conn.execute(
        "INSERT INTO documents (title, content, summary, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![title, content, summary, now],
    )
    .map_err(|e| map_title_conflict(e, title))?;

    get_document(conn, conn.last_insert_rowid())
}

/// Fetch a document by id.
pub fn get_document(conn: &Connection, id: i64) -> Result<Document> {
    conn.query_row(
        &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
        params![id],
        row_to_document,
    )
    .optional()?
    .ok_or(InsightError::DocumentNotFound(id))
}

/// All documents, in id order.
pub fn list_documents(conn: &Connection) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY id"
    ))?;
    let rows = stmt
        .query_map([], row_to_document)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Update title/content/summary and bump `updated_at`.
pub fn update_document(
    conn: &Connection,
    id: i64,
    title: &str,
    content: &str,
    summary: &str,
) -> Result<Document> {
    let now = now_rfc3339();
    let rows = conn
        .execute(
            "UPDATE documents SET title = ?1, content = ?2, summary = ?3, updated_at = ?4 \
             WHERE id = ?5",
            params![title, content, summary, now, id],
        )
        .map_err(|e| map_title_conflict(e, title))?;

    if rows == 0 {
        return Err(InsightError::DocumentNotFound(id));
    }
    get_document(conn, id)
}

/// Link a fragment to a document. Idempotent; the fragment must exist.
pub fn link_fragment(conn: &Connection, document_id: i64, fragment_id: i64) -> Result<()> {
    // Validate so the failure names the missing fragment rather than
    // surfacing a bare FK violation
    crate::store::fragments::get_fragment(conn, fragment_id)?;
    get_document(conn, document_id)?;

    conn.execute(
        "INSERT OR IGNORE INTO fragment_documents (fragment_id, document_id) VALUES (?1, ?2)",
        params![fragment_id, document_id],
    )?;
    Ok(())
}

/// Link a tag to a document. Idempotent.
pub fn link_tag(conn: &Connection, document_id: i64, tag_id: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO document_tags (document_id, tag_id) VALUES (?1, ?2)",
        params![document_id, tag_id],
    )?;
    Ok(())
}

/// Tags linked to a document, in name order.
pub fn tags_for_document(conn: &Connection, document_id: i64) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name FROM tags t \
         INNER JOIN document_tags dt ON dt.tag_id = t.id \
         WHERE dt.document_id = ?1 ORDER BY t.name",
    )?;
    let rows = stmt
        .query_map(params![document_id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Fragments linked to a document, in id order.
pub fn fragments_for_document(conn: &Connection, document_id: i64) -> Result<Vec<Fragment>> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.content, f.url, f.image_path, f.processed, f.parent_id, \
                f.created_at, f.updated_at \
         FROM fragments f \
         INNER JOIN fragment_documents fd ON fd.fragment_id = f.id \
         WHERE fd.document_id = ?1 ORDER BY f.id",
    )?;
    let rows = stmt
        .query_map(params![document_id], |row| {
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
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Snapshot `id → updated_at` for every document. Taken before an agent
/// session; documents that are new or whose timestamp changed afterwards
/// are the ones the session touched.
pub fn snapshot_updated_at(conn: &Connection) -> Result<HashMap<i64, String>> {
    let mut stmt = conn.prepare("SELECT id, updated_at FROM documents")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<HashMap<_, _>>>()?;
    Ok(rows)
}
