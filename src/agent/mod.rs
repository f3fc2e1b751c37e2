//! Consolidation Agent — one LLM session per batch of fragments.
//!
//! The agent builds the thread-aware context, exposes the tool surface, and
//! steps the model until it stops calling tools or the step budget runs
//! out. What a run actually changed is decided by diffing the document
//! store against a pre-session snapshot, not by trusting tool-call return
//! values — the store state is the ground truth, the model's narration is
//! not.

pub mod prompt;
pub mod provider;
pub mod tools;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde_json::{json, Value};

use crate::context;
use crate::error::{InsightError, Result};
use crate::store::documents;
use crate::store::types::Document;
use provider::{ChatProvider, ToolCallRequest};
use tools::ToolExecutor;

/// What one batch run changed.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Documents created or updated during the session, detected via the
    /// snapshot diff.
    pub documents: Vec<Document>,
    /// Completion steps consumed (0 when the model was never invoked).
    pub steps: usize,
    /// Total tool calls executed across all steps.
    pub tool_calls: usize,
}

/// Drives one consolidation session per batch. Owns no persistent state.
///
/// Concurrent batches are not coordinated: if two runs update the same
/// document, the later write wins and the earlier run's diff will not see
/// it. Callers needing isolation must serialize batches externally.
pub struct ConsolidationAgent {
    db: Arc<Mutex<Connection>>,
    provider: Arc<dyn ChatProvider>,
    export_dir: PathBuf,
    max_steps: usize,
}

impl ConsolidationAgent {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        provider: Arc<dyn ChatProvider>,
        export_dir: PathBuf,
        max_steps: usize,
    ) -> Self {
        Self {
            db,
            provider,
            export_dir,
            max_steps,
        }
    }

    /// Consolidate a batch of fragments into documents.
    ///
    /// Fails with [`InsightError::FragmentNotFound`] before the model is
    /// invoked if any input id is missing, and with
    /// [`InsightError::Transport`] if a model call fails mid-session —
    /// committed tool effects stand in both the budget and transport cases.
    pub async fn process_batch(&self, fragment_ids: &[i64]) -> Result<BatchOutcome> {
        if fragment_ids.is_empty() {
            tracing::debug!("empty batch, skipping model call");
            return Ok(BatchOutcome::default());
        }

        let ids = fragment_ids.to_vec();
        let (rendered_context, snapshot) = self
            .with_db(move |conn| {
                let rendered = context::build_context(conn, &ids)?;
                let snapshot = documents::snapshot_updated_at(conn)?;
                Ok((rendered, snapshot))
            })
            .await?;

        tracing::info!(
            fragments = fragment_ids.len(),
            known_documents = snapshot.len(),
            model = self.provider.model(),
            "starting consolidation session"
        );

        let mut messages = vec![
            json!({ "role": "system", "content": prompt::SYSTEM_INSTRUCTIONS }),
            json!({ "role": "user", "content": prompt::consolidation_request(&rendered_context) }),
        ];
        let schemas = tools::tool_schemas();
        let executor = ToolExecutor::new(Arc::clone(&self.db), self.export_dir.clone());

        let mut steps = 0;
        let mut tool_calls = 0;

        while steps < self.max_steps {
            let response = self.provider.chat(&messages, &schemas).await?;
            steps += 1;

            if !response.has_tool_calls() {
                tracing::debug!(steps, "model finished without further tool calls");
                break;
            }

            messages.push(assistant_tool_call_message(&response.tool_calls));

            // Execute in the order the model returned; later calls may
            // depend on rows written by earlier ones
            for call in &response.tool_calls {
                tracing::debug!(step = steps, tool = %call.name, "executing tool call");
                let result = executor.execute(&call.name, &call.arguments).await;
                tool_calls += 1;
                messages.push(tool_result_message(call, &result));
            }
        }

        if steps == self.max_steps {
            tracing::warn!(steps, "step budget exhausted, keeping partial progress");
        }

        let outcome_snapshot = snapshot;
        let documents = self
            .with_db(move |conn| {
                let all = documents::list_documents(conn)?;
                Ok(all
                    .into_iter()
                    .filter(|d| outcome_snapshot.get(&d.id) != Some(&d.updated_at))
                    .collect::<Vec<_>>())
            })
            .await?;

        tracing::info!(
            steps,
            tool_calls,
            documents = documents.len(),
            "consolidation session finished"
        );

        Ok(BatchOutcome {
            documents,
            steps,
            tool_calls,
        })
    }

    /// Run a closure against the shared connection on the blocking pool.
    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| InsightError::Internal(format!("db lock poisoned: {e}")))?;
            f(&conn)
        })
        .await
        .map_err(|e| InsightError::Internal(format!("db task failed: {e}")))?
    }
}

/// Assistant message echoing the model's tool calls, in wire format.
fn assistant_tool_call_message(calls: &[ToolCallRequest]) -> Value {
    let call_json: Vec<Value> = calls
        .iter()
        .map(|call| {
            json!({
                "id": call.id,
                "type": "function",
                "function": {
                    "name": call.name,
                    "arguments": serde_json::to_string(&call.arguments)
                        .unwrap_or_else(|_| "{}".to_string()),
                }
            })
        })
        .collect();
    json!({ "role": "assistant", "content": null, "tool_calls": call_json })
}

/// Tool result message fed back before the next step.
fn tool_result_message(call: &ToolCallRequest, result: &Value) -> Value {
    json!({
        "role": "tool",
        "tool_call_id": call.id,
        "name": call.name,
        "content": result.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_message_serializes_arguments_as_string() {
        let calls = vec![ToolCallRequest {
            id: "call_1".into(),
            name: "createDocument".into(),
            arguments: json!({"title": "T"}),
        }];
        let message = assistant_tool_call_message(&calls);
        assert_eq!(message["role"], "assistant");
        assert_eq!(message["tool_calls"][0]["function"]["name"], "createDocument");
        // Wire format requires stringified arguments
        assert!(message["tool_calls"][0]["function"]["arguments"].is_string());
    }

    #[test]
    fn tool_result_message_echoes_call_id() {
        let call = ToolCallRequest {
            id: "call_9".into(),
            name: "createQuestion".into(),
            arguments: json!({}),
        };
        let message = tool_result_message(&call, &json!({"success": true}));
        assert_eq!(message["tool_call_id"], "call_9");
        assert_eq!(message["role"], "tool");
    }
}
