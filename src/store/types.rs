//! Core record types, matching the SQLite schema row-for-row.
//!
//! Defines [`Fragment`] (a user note, optionally a reply), [`Document`]
//! (a consolidated artifact), [`Tag`], [`Question`] and [`QuestionStatus`].

use serde::{Deserialize, Serialize};

/// A single user-submitted note. Fragments form a forest via `parent_id`
/// (`None` ⇒ root); parent ids are always assigned before children, so the
/// parent chain is finite by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    pub id: i64,
    pub content: String,
    pub url: Option<String>,
    pub image_path: Option<String>,
    /// Set to `true` by the agent once the fragment is linked to a document.
    pub processed: bool,
    pub parent_id: Option<i64>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-modification timestamp.
    pub updated_at: String,
}

/// A consolidated document derived from one or more fragments. Created and
/// updated exclusively through the agent's tool surface; `updated_at` bumps
/// on every update and is the signal used for run reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    /// Globally unique title.
    pub title: String,
    /// Markdown body.
    pub content: String,
    pub summary: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A tag, created on demand when the agent names one that doesn't exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    /// Globally unique name.
    pub name: String,
}

/// Lifecycle status of a clarifying question. Advanced by collaborators
/// outside the consolidation core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Pending,
    Answered,
    Dismissed,
}

impl QuestionStatus {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Answered => "answered",
            Self::Dismissed => "dismissed",
        }
    }
}

impl std::fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QuestionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "answered" => Ok(Self::Answered),
            "dismissed" => Ok(Self::Dismissed),
            _ => Err(format!("unknown question status: {s}")),
        }
    }
}

/// A clarifying question raised by the agent during consolidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub content: String,
    /// Why the agent needed to ask.
    pub context: String,
    pub document_id: Option<i64>,
    pub fragment_id: Option<i64>,
    pub status: QuestionStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn question_status_round_trips() {
        for status in [
            QuestionStatus::Pending,
            QuestionStatus::Answered,
            QuestionStatus::Dismissed,
        ] {
            assert_eq!(QuestionStatus::from_str(status.as_str()), Ok(status));
        }
    }

    #[test]
    fn question_status_rejects_unknown() {
        assert!(QuestionStatus::from_str("open").is_err());
    }
}
