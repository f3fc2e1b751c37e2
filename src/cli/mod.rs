//! CLI command implementations. Thin wrappers over the library: open the
//! database, call into the store or agent, print results.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use insight::agent::{provider, ConsolidationAgent};
use insight::config::InsightConfig;
use insight::db;
use insight::store::types::QuestionStatus;
use insight::store::{documents, fragments, questions};

/// Store a new fragment, optionally as a reply to an existing one.
pub fn capture(
    config: &InsightConfig,
    content: &str,
    parent: Option<i64>,
    url: Option<&str>,
) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let fragment = fragments::insert_fragment(&conn, content, url, None, parent)
        .context("failed to store fragment")?;

    match fragment.parent_id {
        Some(pid) => println!("Captured fragment {} (reply to {})", fragment.id, pid),
        None => println!("Captured fragment {}", fragment.id),
    }
    Ok(())
}

/// Run the consolidation agent over explicit fragment ids, or over all
/// unprocessed fragments when `ids` is empty.
pub async fn process(config: &InsightConfig, ids: Vec<i64>) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;

    let ids = if ids.is_empty() {
        fragments::list_unprocessed(&conn)
            .context("failed to list unprocessed fragments")?
            .iter()
            .map(|f| f.id)
            .collect()
    } else {
        ids
    };

    if ids.is_empty() {
        println!("No unprocessed fragments found.");
        return Ok(());
    }
    println!("Processing {} fragment(s)...", ids.len());

    let provider: Arc<dyn provider::ChatProvider> =
        Arc::from(provider::create_provider(&config.agent)?);
    let agent = ConsolidationAgent::new(
        Arc::new(Mutex::new(conn)),
        provider,
        config.resolved_export_dir(),
        config.agent.max_steps,
    );

    let outcome = agent.process_batch(&ids).await?;

    if outcome.documents.is_empty() {
        println!(
            "Session finished ({} steps, {} tool calls) — no documents changed.",
            outcome.steps, outcome.tool_calls
        );
    } else {
        println!(
            "Session finished ({} steps, {} tool calls). Documents:",
            outcome.steps, outcome.tool_calls
        );
        for doc in &outcome.documents {
            println!("  [{}] {} — {}", doc.id, doc.title, doc.summary);
        }
    }
    Ok(())
}

/// List all documents.
pub fn list_documents(config: &InsightConfig) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let docs = documents::list_documents(&conn)?;

    if docs.is_empty() {
        println!("No documents yet.");
        return Ok(());
    }
    for doc in docs {
        println!("[{}] {} — {}", doc.id, doc.title, doc.summary);
    }
    Ok(())
}

/// Mark a question answered or dismissed.
pub fn resolve_question(config: &InsightConfig, id: i64, status: QuestionStatus) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let question = questions::update_status(&conn, id, status)
        .context("failed to update question status")?;
    println!("Question {} marked {}", question.id, question.status);
    Ok(())
}

/// List clarifying questions with the given status.
pub fn list_questions(config: &InsightConfig, status: QuestionStatus) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let items = questions::list_by_status(&conn, status)?;

    if items.is_empty() {
        println!("No {status} questions.");
        return Ok(());
    }
    for q in items {
        println!("[{}] {}", q.id, q.content);
        println!("    context: {}", q.context);
        if let Some(doc_id) = q.document_id {
            println!("    document: {doc_id}");
        }
    }
    Ok(())
}
