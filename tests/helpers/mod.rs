#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::Value;

use insight::agent::provider::{ChatProvider, ChatResponse, ToolCallRequest};
use insight::db;
use insight::error::{InsightError, Result};
use insight::store::{documents, fragments};

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Shared connection handle, as the agent and tool executor expect.
pub fn shared_test_db() -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(test_db()))
}

/// Insert a root fragment and return its id.
pub fn seed_fragment(conn: &Connection, content: &str) -> i64 {
    fragments::insert_fragment(conn, content, None, None, None)
        .unwrap()
        .id
}

/// Insert a reply fragment and return its id.
pub fn seed_reply(conn: &Connection, content: &str, parent_id: i64) -> i64 {
    fragments::insert_fragment(conn, content, None, None, Some(parent_id))
        .unwrap()
        .id
}

/// Insert a document with placeholder content and return its id.
pub fn seed_document(conn: &Connection, title: &str) -> i64 {
    documents::insert_document(conn, title, "content", "summary")
        .unwrap()
        .id
}

/// Rewind a document's updated_at so subsequent writes visibly bump it.
pub fn backdate_document(conn: &Connection, id: i64) {
    conn.execute(
        "UPDATE documents SET updated_at = '2020-01-01T00:00:00+00:00' WHERE id = ?1",
        [id],
    )
    .unwrap();
}

/// Scripted model: hands out queued responses in order and counts calls.
/// Once the queue is empty it returns a plain completion, or a transport
/// error when built with [`MockProvider::failing`].
pub struct MockProvider {
    responses: Mutex<VecDeque<ChatResponse>>,
    calls: AtomicUsize,
    fail_when_empty: bool,
}

impl MockProvider {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            fail_when_empty: false,
        }
    }

    pub fn failing(responses: Vec<ChatResponse>) -> Self {
        Self {
            fail_when_empty: true,
            ..Self::new(responses)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn chat(&self, _messages: &[Value], _tools: &[Value]) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => Ok(response),
            None if self.fail_when_empty => {
                Err(InsightError::Transport("connection reset".into()))
            }
            None => Ok(done()),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}

/// A completion step carrying a single tool call.
pub fn tool_call(name: &str, arguments: Value) -> ChatResponse {
    tool_calls(vec![(name, arguments)])
}

/// A completion step carrying several tool calls, in order.
pub fn tool_calls(calls: Vec<(&str, Value)>) -> ChatResponse {
    let tool_calls = calls
        .into_iter()
        .enumerate()
        .map(|(i, (name, arguments))| ToolCallRequest {
            id: format!("call_{i}_{name}"),
            name: name.to_string(),
            arguments,
        })
        .collect();
    ChatResponse {
        content: None,
        tool_calls,
        finish_reason: "tool_calls".into(),
    }
}

/// A terminal completion without tool calls.
pub fn done() -> ChatResponse {
    ChatResponse {
        content: Some("done".into()),
        tool_calls: vec![],
        finish_reason: "stop".into(),
    }
}
