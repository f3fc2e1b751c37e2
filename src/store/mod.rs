//! CRUD over the four record tables and the two idempotent link tables.
//!
//! Functions here return typed [`InsightError`](crate::error::InsightError)s;
//! the tool surface converts them to structured failure results, the context
//! builder lets them propagate as pre-session batch failures.

pub mod documents;
pub mod fragments;
pub mod questions;
pub mod tags;
pub mod types;

/// Current time as an RFC 3339 string, the timestamp format used everywhere.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
