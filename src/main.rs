mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use insight::config::InsightConfig;
use insight::store::types::QuestionStatus;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "insight",
    version,
    about = "Capture fragments and consolidate them into documents with an LLM agent"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a new fragment
    Capture {
        /// Fragment text
        content: String,
        /// Reply to an existing fragment
        #[arg(long)]
        parent: Option<i64>,
        /// Source URL
        #[arg(long)]
        url: Option<String>,
    },
    /// Consolidate fragments into documents
    Process {
        /// Fragment ids to process; defaults to all unprocessed fragments
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,
    },
    /// List consolidated documents
    Documents,
    /// List clarifying questions, or mark one answered/dismissed
    Questions {
        /// Filter by status: pending, answered, dismissed
        #[arg(long, default_value = "pending")]
        status: QuestionStatus,
        /// Mark a question as answered
        #[arg(long, conflicts_with = "dismiss")]
        answer: Option<i64>,
        /// Mark a question as dismissed
        #[arg(long)]
        dismiss: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = InsightConfig::load()?;

    // Log to stderr so stdout stays clean for command output.
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Capture {
            content,
            parent,
            url,
        } => {
            cli::capture(&config, &content, parent, url.as_deref())?;
        }
        Command::Process { ids } => {
            cli::process(&config, ids).await?;
        }
        Command::Documents => {
            cli::list_documents(&config)?;
        }
        Command::Questions {
            status,
            answer,
            dismiss,
        } => {
            if let Some(id) = answer {
                cli::resolve_question(&config, id, QuestionStatus::Answered)?;
            } else if let Some(id) = dismiss {
                cli::resolve_question(&config, id, QuestionStatus::Dismissed)?;
            } else {
                cli::list_questions(&config, status)?;
            }
        }
    }

    Ok(())
}
