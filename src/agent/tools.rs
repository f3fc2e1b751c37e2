//! Tool Surface — the four actions the model may invoke.
//!
//! Dispatch is a closed tagged union: `(name, arguments)` parses into a
//! [`ToolAction`] variant or a validation failure. Execution never raises;
//! every outcome is JSON of the shape `{"success": true, ...}` or
//! `{"success": false, "error": "..."}` so a single bad call cannot abort
//! the session. Writes are visible to later calls in the same run.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{InsightError, Result};
use crate::export;
use crate::store::{documents, fragments, questions, tags};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetDocumentDetailParams {
    #[schemars(description = "Document ID to get details for")]
    pub document_id: i64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentParams {
    #[schemars(description = "Document title (must be unique)")]
    pub title: String,

    #[schemars(description = "Document content in Markdown")]
    pub content: String,

    #[schemars(description = "Document summary")]
    pub summary: String,

    #[schemars(description = "Array of tag names; missing tags are created")]
    pub tags: Vec<String>,

    #[schemars(description = "Fragment IDs to link to this document")]
    pub fragment_ids: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentParams {
    #[schemars(description = "Document ID to update")]
    pub document_id: i64,

    #[schemars(description = "New document title")]
    pub title: String,

    #[schemars(description = "New document content in Markdown")]
    pub content: String,

    #[schemars(description = "New document summary")]
    pub summary: String,

    #[schemars(description = "Array of tag names; missing tags are created")]
    pub tags: Vec<String>,

    #[schemars(description = "Fragment IDs to link to this document")]
    pub fragment_ids: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionParams {
    #[schemars(description = "The question to ask the user")]
    pub content: String,

    #[schemars(description = "Context explaining why this question is needed")]
    pub context: String,

    #[schemars(description = "Related document ID if applicable")]
    pub document_id: Option<i64>,

    #[schemars(description = "Related fragment ID if applicable")]
    pub fragment_id: Option<i64>,
}

/// The closed set of actions the model may take.
#[derive(Debug)]
pub enum ToolAction {
    GetDocumentDetail(GetDocumentDetailParams),
    CreateDocument(CreateDocumentParams),
    UpdateDocument(UpdateDocumentParams),
    CreateQuestion(CreateQuestionParams),
}

impl ToolAction {
    /// Parse a named tool call. Unknown names and schema-invalid arguments
    /// are validation errors, surfaced to the model as failure results.
    pub fn parse(name: &str, arguments: &Value) -> Result<Self> {
        let invalid = |e: serde_json::Error| InsightError::InvalidToolArguments {
            tool: name.to_string(),
            message: e.to_string(),
        };
        match name {
            "getDocumentDetail" => Ok(Self::GetDocumentDetail(
                serde_json::from_value(arguments.clone()).map_err(invalid)?,
            )),
            "createDocument" => Ok(Self::CreateDocument(
                serde_json::from_value(arguments.clone()).map_err(invalid)?,
            )),
            "updateDocument" => Ok(Self::UpdateDocument(
                serde_json::from_value(arguments.clone()).map_err(invalid)?,
            )),
            "createQuestion" => Ok(Self::CreateQuestion(
                serde_json::from_value(arguments.clone()).map_err(invalid)?,
            )),
            other => Err(InsightError::InvalidToolArguments {
                tool: other.to_string(),
                message: "unknown tool".to_string(),
            }),
        }
    }
}

fn function_declaration(name: &str, description: &str, parameters: Value) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": parameters,
        }
    })
}

/// OpenAI-style function declarations for the full tool surface.
pub fn tool_schemas() -> Vec<Value> {
    let schema = |s: schemars::Schema| serde_json::to_value(s).unwrap_or_else(|_| json!({}));
    vec![
        function_declaration(
            "getDocumentDetail",
            "Get detailed content of a specific document to make update decisions",
            schema(schema_for!(GetDocumentDetailParams)),
        ),
        function_declaration(
            "createDocument",
            "Create a new document with title, content, summary, and tags, and link fragments",
            schema(schema_for!(CreateDocumentParams)),
        ),
        function_declaration(
            "updateDocument",
            "Update an existing document by ID and link fragments",
            schema(schema_for!(UpdateDocumentParams)),
        ),
        function_declaration(
            "createQuestion",
            "Create a clarifying question to gather more information after documenting",
            schema(schema_for!(CreateQuestionParams)),
        ),
    ]
}

/// Executes tool actions against the stores. One executor is built per
/// batch with explicit store handles — no closures over ambient state.
#[derive(Clone)]
pub struct ToolExecutor {
    db: Arc<Mutex<Connection>>,
    export_dir: PathBuf,
}

impl ToolExecutor {
    pub fn new(db: Arc<Mutex<Connection>>, export_dir: PathBuf) -> Self {
        Self { db, export_dir }
    }

    /// Execute one tool call. Never fails: every error becomes a
    /// `{"success": false, "error": ...}` value fed back to the model.
    pub async fn execute(&self, name: &str, arguments: &Value) -> Value {
        let action = match ToolAction::parse(name, arguments) {
            Ok(action) => action,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool call rejected");
                return failure(&e);
            }
        };

        let db = Arc::clone(&self.db);
        let export_dir = self.export_dir.clone();
        let result = tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| InsightError::Internal(format!("db lock poisoned: {e}")))?;
            run_action(&conn, &export_dir, action)
        })
        .await
        .unwrap_or_else(|e| Err(InsightError::Internal(format!("tool task failed: {e}"))));

        match result {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool call failed");
                failure(&e)
            }
        }
    }
}

fn failure(error: &InsightError) -> Value {
    json!({ "success": false, "error": error.to_string() })
}

/// Sole synchronous dispatch point for tool side effects.
fn run_action(conn: &Connection, export_dir: &std::path::Path, action: ToolAction) -> Result<Value> {
    match action {
        ToolAction::GetDocumentDetail(params) => {
            let document = documents::get_document(conn, params.document_id)?;
            Ok(json!({
                "success": true,
                "document": {
                    "id": document.id,
                    "title": document.title,
                    "content": document.content,
                    "summary": document.summary,
                    "createdAt": document.created_at,
                    "updatedAt": document.updated_at,
                }
            }))
        }
        ToolAction::CreateDocument(params) => {
            let document =
                documents::insert_document(conn, &params.title, &params.content, &params.summary)?;
            tracing::info!(id = document.id, title = %document.title, "document created");

            // The document row is committed regardless of what follows:
            // a failed link surfaces as a failure result, not a rollback
            attach_links(conn, document.id, &params.tags, &params.fragment_ids)?;
            export_best_effort(conn, export_dir, document.id);

            Ok(json!({
                "success": true,
                "documentId": document.id,
                "title": document.title,
            }))
        }
        ToolAction::UpdateDocument(params) => {
            let document = documents::update_document(
                conn,
                params.document_id,
                &params.title,
                &params.content,
                &params.summary,
            )?;
            tracing::info!(id = document.id, title = %document.title, "document updated");

            attach_links(conn, document.id, &params.tags, &params.fragment_ids)?;
            export_best_effort(conn, export_dir, document.id);

            Ok(json!({
                "success": true,
                "documentId": document.id,
                "title": document.title,
                "updated": true,
            }))
        }
        ToolAction::CreateQuestion(params) => {
            let question = questions::insert_question(
                conn,
                &params.content,
                &params.context,
                params.document_id,
                params.fragment_id,
            )?;
            tracing::info!(id = question.id, "clarifying question created");

            Ok(json!({
                "success": true,
                "questionId": question.id,
                "content": question.content,
            }))
        }
    }
}

/// Find-or-create and link each tag, then link each fragment and mark it
/// processed. Sequential, since links depend on the tag rows created just
/// before them.
fn attach_links(
    conn: &Connection,
    document_id: i64,
    tag_names: &[String],
    fragment_ids: &[i64],
) -> Result<()> {
    for name in tag_names {
        let tag = tags::find_or_create_tag(conn, name)?;
        documents::link_tag(conn, document_id, tag.id)?;
    }
    for &fragment_id in fragment_ids {
        documents::link_fragment(conn, document_id, fragment_id)?;
        fragments::mark_processed(conn, fragment_id)?;
    }
    Ok(())
}

/// Markdown export runs after the database write committed; a failed write
/// to disk must not fail the tool call.
fn export_best_effort(conn: &Connection, export_dir: &std::path::Path, document_id: i64) {
    let result = documents::get_document(conn, document_id)
        .and_then(|document| export::export_document(conn, export_dir, &document));
    if let Err(e) = result {
        tracing::warn!(document_id, error = %e, "markdown export failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_unknown_tool() {
        let err = ToolAction::parse("dropAllTables", &json!({})).unwrap_err();
        assert!(matches!(err, InsightError::InvalidToolArguments { tool, .. } if tool == "dropAllTables"));
    }

    #[test]
    fn parse_rejects_schema_invalid_arguments() {
        // documentId must be an integer
        let err =
            ToolAction::parse("getDocumentDetail", &json!({"documentId": "five"})).unwrap_err();
        assert!(matches!(err, InsightError::InvalidToolArguments { .. }));
    }

    #[test]
    fn parse_accepts_camel_case_arguments() {
        let action = ToolAction::parse(
            "createDocument",
            &json!({
                "title": "T",
                "content": "c",
                "summary": "s",
                "tags": ["a"],
                "fragmentIds": [1, 2],
            }),
        )
        .unwrap();
        match action {
            ToolAction::CreateDocument(params) => {
                assert_eq!(params.fragment_ids, vec![1, 2]);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn schemas_cover_all_four_tools() {
        let schemas = tool_schemas();
        let names: Vec<&str> = schemas
            .iter()
            .map(|s| s["function"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "getDocumentDetail",
                "createDocument",
                "updateDocument",
                "createQuestion"
            ]
        );
        // Parameters must be real schemas, not empty placeholders
        for schema in &schemas {
            assert!(schema["function"]["parameters"].is_object());
        }
    }
}
