//! Fragment capture and LLM-driven knowledge consolidation.
//!
//! Insight stores small unstructured notes ("fragments", optionally
//! threaded as replies) in SQLite, then lets an LLM agent consolidate them
//! into longer-lived Markdown documents with tags and optional clarifying
//! questions. The agent works entirely through tool calling: it sees the
//! fragment threads and existing documents as rendered context, and acts
//! through a fixed, schema-validated tool surface.
//!
//! # Architecture
//!
//! - **Storage**: SQLite via rusqlite — fragments, documents, tags,
//!   questions, and two idempotent link tables
//! - **Context**: threads rendered root-first with positional role labels,
//!   plus a listing of existing documents
//! - **Agent**: one chat session per batch, up to 20 steps, sequential
//!   tool execution, results reconciled by diffing `updated_at` snapshots
//! - **Export**: every document write regenerates a Markdown file
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, and migrations
//! - [`store`] — CRUD over fragments, documents, tags, and questions
//! - [`context`] — Thread-aware prompt context rendering
//! - [`agent`] — Consolidation session loop, tool surface, model providers
//! - [`export`] — Markdown file generation

pub mod agent;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod export;
pub mod store;
