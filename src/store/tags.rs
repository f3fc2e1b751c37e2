//! Tag lookup and on-demand creation.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::store::now_rfc3339;
use crate::store::types::Tag;

/// Find a tag by name, creating it if absent. Tag names are globally unique.
pub fn find_or_create_tag(conn: &Connection, name: &str) -> Result<Tag> {
    let existing: Option<Tag> = conn
        .query_row(
            "SELECT id, name FROM tags WHERE name = ?1",
            params![name],
            |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;

    if let Some(tag) = existing {
        return Ok(tag);
    }

    let now = now_rfc3339();
    conn.execute(
        "INSERT INTO tags (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
        params![name, now],
    )?;

    Ok(Tag {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}
