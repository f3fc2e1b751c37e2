//! Context Builder — renders a batch of fragments into one prompt block.
//!
//! The rendering preserves conversational structure: a reply is shown with
//! its full ancestor chain, a root is shown with its direct children, a
//! loose note is shown standalone. A listing of existing documents is
//! appended so the model can decide between creating and updating.
//!
//! Output is deterministic for a fixed store state — no timestamps or
//! random content appear in the rendered text.

use rusqlite::Connection;

use crate::error::Result;
use crate::store::types::Fragment;
use crate::store::{documents, fragments};

/// Separator between a post and its reply, marking temporal order.
const REPLY_SEPARATOR: &str = "\n↓ in reply\n";

/// Build the consolidation context for a set of fragment ids.
///
/// Fails with [`FragmentNotFound`](crate::error::InsightError::FragmentNotFound)
/// if any input id is missing — no partial context is produced.
pub fn build_context(conn: &Connection, fragment_ids: &[i64]) -> Result<String> {
    let mut blocks = Vec::with_capacity(fragment_ids.len());

    for &id in fragment_ids {
        let fragment = fragments::get_fragment(conn, id)?;
        blocks.push(render_fragment_block(conn, &fragment)?);
    }

    let mut out = String::from("Unprocessed fragments (with thread structure):\n\n");
    out.push_str(&blocks.join("\n\n"));
    out.push_str("\n\nExisting documents:\n");
    out.push_str(&render_document_listing(conn)?);
    Ok(out)
}

fn render_fragment_block(conn: &Connection, fragment: &Fragment) -> Result<String> {
    if fragment.parent_id.is_some() {
        // Reply: show the whole chain from the thread root down to this post
        let chain = fragments::ancestor_chain(conn, fragment.id)?;
        let last = chain.len() - 1;
        let rendered: Vec<String> = chain
            .iter()
            .enumerate()
            .map(|(index, f)| {
                let role = if index == 0 {
                    "[root post]"
                } else if index == last {
                    "[this post]"
                } else {
                    "[reply]"
                };
                format!("{role} ID: {} - {}", f.id, f.content)
            })
            .collect();
        return Ok(format!(
            "Conversation thread:\n{}",
            rendered.join(REPLY_SEPARATOR)
        ));
    }

    let children = fragments::children(conn, fragment.id)?;
    if children.is_empty() {
        return Ok(format!(
            "Standalone post:\nID: {} - {}",
            fragment.id, fragment.content
        ));
    }

    // Root with replies: flat block, no deeper nesting
    let mut block = format!(
        "Conversation thread:\n[original post] ID: {} - {}",
        fragment.id, fragment.content
    );
    for child in &children {
        block.push_str(REPLY_SEPARATOR);
        block.push_str(&format!("[reply] ID: {} - {}", child.id, child.content));
    }
    Ok(block)
}

fn render_document_listing(conn: &Connection) -> Result<String> {
    let docs = documents::list_documents(conn)?;
    if docs.is_empty() {
        return Ok("No existing documents.".to_string());
    }
    let lines: Vec<String> = docs
        .iter()
        .map(|d| format!("ID: {}, Title: {}, Summary: {}", d.id, d.title, d.summary))
        .collect();
    Ok(lines.join("\n"))
}
