//! CLI interface for ticketstore.
//!
//! Each subcommand is non-interactive: arguments in, structured output out.
//! JSON results go to stdout; confirmations go to stderr.

mod format;

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Config;
use crate::credentials::{resolve_identity, resolve_secret, staging_requested};
use crate::model::{CommentId, JobMap};
use crate::store::TicketStore;
use crate::tracker::JiraTracker;

use format::format_update;

/// ticketstore — structured data kept in a ticket field.
#[derive(Debug, Parser)]
#[command(name = "ticketstore", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Identity to authenticate as. Overrides TICKETSTORE_IDENTITY and the config file.
    #[arg(long = "as", global = true)]
    identity: Option<String>,

    /// Talk to the staging server instead of production.
    #[arg(long, global = true)]
    staging: bool,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: tracking jobs on a ticket
  1. ticketstore list
  2. ticketstore show EXAMPLE-12
  3. ticketstore set-items EXAMPLE-12 --file items.json
  4. ticketstore add-job EXAMPLE-12 build-41 --description "nightly build" --item api
  5. ticketstore comment EXAMPLE-12 "build-41 started"

Every write replaces the whole field. Concurrent writers to one ticket can
lose updates; run one writer per ticket."#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show a ticket's summary, payload, and comments as JSON.
    ///
    /// Pure read, no side effects.
    Show {
        /// Ticket key (e.g. `EXAMPLE-12`).
        key: String,
    },

    /// List open tickets as `<key>: <summary>` lines.
    List {
        /// Project to list. Defaults to the configured project.
        #[arg(long)]
        project: Option<String>,
    },

    /// Record a job, replacing any job with the same id.
    AddJob {
        /// Ticket key.
        key: String,

        /// Job identifier.
        job_id: String,

        /// What the job does.
        #[arg(long)]
        description: String,

        /// The item the job works on.
        #[arg(long)]
        item: String,
    },

    /// Replace every job with a JSON object read from `--file` or stdin.
    SetJobs {
        /// Ticket key.
        key: String,

        /// JSON file holding `{"<job id>": {"description": ..., "item": ...}}`.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Replace every item with a JSON array read from `--file` or stdin.
    SetItems {
        /// Ticket key.
        key: String,

        /// JSON file holding the item array.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Append one item, given as JSON.
    AppendItem {
        /// Ticket key.
        key: String,

        /// Item as JSON (quote strings: `'"abc"'`).
        item: String,
    },

    /// Post a comment. Prints the comment id.
    Comment {
        /// Ticket key.
        key: String,

        /// Comment body.
        body: String,
    },

    /// Replace the body of an existing comment.
    EditComment {
        /// Ticket key.
        key: String,

        /// Comment id, as printed by `comment`.
        id: String,

        /// New comment body.
        body: String,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config) -> Result<(), String> {
    let cli = Cli::parse();

    let identity = resolve_identity(cli.identity.as_deref(), config).map_err(|e| e.to_string())?;
    let secret = resolve_secret(config).map_err(|e| e.to_string())?;
    let client = config
        .resolve(identity, secret, staging_requested(cli.staging))
        .map_err(|e| e.to_string())?;
    let tracker = JiraTracker::new(&client, &config.field).map_err(|e| e.to_string())?;
    let store = TicketStore::new(tracker);

    match cli.command {
        Command::Show { key } => {
            let details = store.fetch(&key).map_err(|e| e.to_string())?;
            print_json(&details)
        }
        Command::List { project } => {
            let project = project.as_deref().unwrap_or(&config.project);
            let lines = store.list_open(project).map_err(|e| e.to_string())?;
            if lines.is_empty() {
                eprintln!("No open tickets in {project}");
            }
            for line in lines {
                println!("{line}");
            }
            Ok(())
        }
        Command::AddJob {
            key,
            job_id,
            description,
            item,
        } => {
            let update = store
                .add_job(&job_id, &key, &description, &item)
                .map_err(|e| e.to_string())?;
            eprintln!("{}", format_update(&update));
            Ok(())
        }
        Command::SetJobs { key, file } => {
            let jobs: JobMap = read_json(file.as_deref())?;
            let update = store.replace_jobs(jobs, &key).map_err(|e| e.to_string())?;
            eprintln!("{}", format_update(&update));
            Ok(())
        }
        Command::SetItems { key, file } => {
            let items: Vec<Value> = read_json(file.as_deref())?;
            let update = store.replace_items(items, &key).map_err(|e| e.to_string())?;
            eprintln!("{}", format_update(&update));
            Ok(())
        }
        Command::AppendItem { key, item } => {
            let item: Value =
                serde_json::from_str(&item).map_err(|e| format!("item is not valid JSON: {e}"))?;
            let update = store.append_item(item, &key).map_err(|e| e.to_string())?;
            eprintln!("{}", format_update(&update));
            Ok(())
        }
        Command::Comment { key, body } => {
            let id = store.post_comment(&body, &key).map_err(|e| e.to_string())?;
            println!("{}", id.id);
            Ok(())
        }
        Command::EditComment { key, id, body } => {
            let id = CommentId { key, id };
            store.update_comment(&id, &body).map_err(|e| e.to_string())?;
            eprintln!("Updated comment {id}");
            Ok(())
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("failed to serialize output: {e}"))?;
    println!("{json}");
    Ok(())
}

/// Read JSON from a file, or from stdin when no file is given.
fn read_json<T: DeserializeOwned>(file: Option<&Path>) -> Result<T, String> {
    let (source, contents) = match file {
        Some(path) => (
            path.display().to_string(),
            std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?,
        ),
        None => {
            let mut contents = String::new();
            io::stdin()
                .read_to_string(&mut contents)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            ("stdin".to_string(), contents)
        }
    };

    serde_json::from_str(&contents).map_err(|e| format!("invalid JSON in {source}: {e}"))
}
