//! Markdown export for consolidated documents.
//!
//! Every successful `createDocument`/`updateDocument` regenerates the
//! document's `.md` file under the export directory. Export is best-effort:
//! callers log failures and keep the tool result successful, since the
//! database write has already committed.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::Result;
use crate::store::documents;
use crate::store::types::{Document, Fragment, Tag};

/// Maximum filename length (characters) before truncation.
const MAX_FILENAME_CHARS: usize = 100;

/// Replace characters unsafe in filenames with `_`, collapse whitespace
/// runs to `_`, and truncate overlong titles.
pub fn sanitize_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut in_whitespace = false;

    for c in title.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => out.push('_'),
            _ => out.push(c),
        }
    }

    out.chars().take(MAX_FILENAME_CHARS).collect()
}

/// Render a document plus its linked tags and fragments as Markdown.
pub fn render_markdown(document: &Document, tags: &[Tag], fragments: &[Fragment]) -> String {
    let tag_list = if tags.is_empty() {
        "(none)".to_string()
    } else {
        tags.iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let fragment_rows = if fragments.is_empty() {
        "| - | no fragments | - | - |".to_string()
    } else {
        fragments
            .iter()
            .map(|f| {
                format!(
                    "| {} | {} | {} | {} |",
                    f.id,
                    f.content,
                    f.url.as_deref().unwrap_or("-"),
                    f.image_path.as_deref().unwrap_or("-")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "{content}\n\n---\n\n## Metadata\n\n\
         | Field | Value |\n|------|------|\n\
         | **Summary** | {summary} |\n\
         | **Tags** | {tag_list} |\n\
         | **Created** | {created} |\n\
         | **Updated** | {updated} |\n\
         | **Document ID** | {id} |\n\n\
         ## Source fragments\n\n\
         | ID | Content | URL | Image |\n|----|---------|-----|-------|\n\
         {fragment_rows}\n",
        content = document.content,
        summary = document.summary,
        created = document.created_at,
        updated = document.updated_at,
        id = document.id,
    )
}

/// Write the rendered Markdown for a document into `export_dir`, creating
/// the directory if needed. Returns the written path.
pub fn export_document(
    conn: &Connection,
    export_dir: &Path,
    document: &Document,
) -> Result<PathBuf> {
    let tags = documents::tags_for_document(conn, document.id)?;
    let fragments = documents::fragments_for_document(conn, document.id)?;
    let markdown = render_markdown(document, &tags, &fragments);

    std::fs::create_dir_all(export_dir)?;
    let path = export_dir.join(format!("{}.md", sanitize_filename(&document.title)));
    std::fs::write(&path, markdown)?;

    tracing::debug!(path = %path.display(), "markdown exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_filename("what?*"), "what__");
        assert_eq!(sanitize_filename("<title>"), "_title_");
    }

    #[test]
    fn sanitize_collapses_whitespace_runs() {
        assert_eq!(sanitize_filename("Rust  Async   Notes"), "Rust_Async_Notes");
    }

    #[test]
    fn sanitize_truncates_long_titles() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_filename(&long).chars().count(), 100);
    }

    #[test]
    fn render_includes_metadata_and_fragments() {
        let doc = Document {
            id: 3,
            title: "T".into(),
            content: "# Body".into(),
            summary: "short".into(),
            created_at: "2025-01-01T00:00:00+00:00".into(),
            updated_at: "2025-01-02T00:00:00+00:00".into(),
        };
        let tags = vec![Tag {
            id: 1,
            name: "rust".into(),
        }];
        let fragments = vec![Fragment {
            id: 9,
            content: "a note".into(),
            url: Some("https://example.com".into()),
            image_path: None,
            processed: true,
            parent_id: None,
            created_at: "t".into(),
            updated_at: "t".into(),
        }];

        let md = render_markdown(&doc, &tags, &fragments);
        assert!(md.starts_with("# Body"));
        assert!(md.contains("| **Summary** | short |"));
        assert!(md.contains("| **Tags** | rust |"));
        assert!(md.contains("| 9 | a note | https://example.com | - |"));
    }

    #[test]
    fn render_handles_empty_links() {
        let doc = Document {
            id: 1,
            title: "T".into(),
            content: "c".into(),
            summary: "s".into(),
            created_at: "t".into(),
            updated_at: "t".into(),
        };
        let md = render_markdown(&doc, &[], &[]);
        assert!(md.contains("| **Tags** | (none) |"));
        assert!(md.contains("| - | no fragments | - | - |"));
    }
}
