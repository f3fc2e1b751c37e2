//! Clarifying-question persistence.
//!
//! Questions are created through the agent's `createQuestion` tool with
//! status `pending`; answering or dismissing them happens outside the
//! consolidation core.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{InsightError, Result};
use crate::store::now_rfc3339;
use crate::store::types::{Question, QuestionStatus};

fn row_to_question(row: &rusqlite::Row<'_>) -> rusqlite::Result<Question> {
    let status: String = row.get(5)?;
    Ok(Question {
        id: row.get(0)?,
        content: row.get(1)?,
        context: row.get(2)?,
        document_id: row.get(3)?,
        fragment_id: row.get(4)?,
        status: status.parse().unwrap_or(QuestionStatus::Pending),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const QUESTION_COLUMNS: &str =
    "id, content, context, document_id, fragment_id, status, created_at, updated_at";

/// Insert a new question with status `pending`.
pub fn insert_question(
    conn: &Connection,
    content: &str,
    context: &str,
    document_id: Option<i64>,
    fragment_id: Option<i64>,
) -> Result<Question> {
    let now = now_rfc3339();
    conn.execute(
        "INSERT INTO questions (content, context, document_id, fragment_id, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)",
        params![content, context, document_id, fragment_id, now],
    )?;

    let id = conn.last_insert_rowid();
    conn.query_row(
        &format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1"),
        params![id],
        row_to_question,
    )
    .map_err(InsightError::from)
}

/// Questions with the given status, in id order.
pub fn list_by_status(conn: &Connection, status: QuestionStatus) -> Result<Vec<Question>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE status = ?1 ORDER BY id"
    ))?;
    let rows = stmt
        .query_map(params![status.as_str()], row_to_question)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Advance a question's lifecycle status.
pub fn update_status(conn: &Connection, id: i64, status: QuestionStatus) -> Result<Question> {
    let now = now_rfc3339();
    conn.execute(
        "UPDATE questions SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, id],
    )?;

    conn.query_row(
        &format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1"),
        params![id],
        row_to_question,
    )
    .optional()?
    .ok_or(InsightError::Internal(format!("question not found: {id}")))
}
