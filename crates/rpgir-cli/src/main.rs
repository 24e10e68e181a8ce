//! Resource plan graph CLI.
//!
//! Provides the `rpgir` binary with subcommands for working with a plan
//! document stored as JSON in a plan directory. `call` routes any tool by
//! name through the same dispatch the programmatic surface uses, so both
//! entry points behave identically; the other subcommands are shorthands for
//! the common lifecycle tools.

use std::io::Read;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde_json::Value;

use rpgir_engine::{PlanSession, ToolResponse};
use rpgir_store::JsonFileStore;

/// Resource plan graph tools.
#[derive(Parser)]
#[command(name = "rpgir", about = "Resource plan graph tools")]
struct Cli {
    /// Plan directory holding the document.
    #[arg(short, long, default_value = ".rpg")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Create the plan document.
    Init {
        /// Project name.
        #[arg(short, long)]
        project: String,

        /// One-line project summary.
        #[arg(short, long, default_value = "")]
        summary: String,

        /// Default implementation language for nodes.
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Call any tool by name with JSON parameters.
    Call {
        /// Tool name, e.g. `add_node`.
        tool: String,

        /// Parameters as a JSON object; `-` reads them from stdin.
        #[arg(default_value = "null")]
        params: String,

        /// Idempotency key; retries with the same id replay the response.
        #[arg(short, long)]
        request_id: Option<String>,
    },

    /// Validate the graph and advance the phase when clean.
    Validate,

    /// Export a snapshot of the document.
    Export {
        /// Output format: json or yaml.
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Emit the ordered implementation batches.
    Batches,

    /// Score plan completeness.
    Score,
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let store = match JsonFileStore::open(&cli.dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to open plan directory '{}': {}", cli.dir.display(), e);
            process::exit(3);
        }
    };
    let mut session = PlanSession::new(store);

    let response = match cli.command {
        Commands::Init {
            project,
            summary,
            language,
        } => session.dispatch(
            "start_session",
            None,
            serde_json::json!({
                "project": project,
                "summary": summary,
                "default_language": language,
            }),
        ),
        Commands::Call {
            tool,
            params,
            request_id,
        } => {
            let params = match read_params(&params) {
                Ok(v) => v,
                Err(msg) => {
                    eprintln!("Error: {}", msg);
                    process::exit(2);
                }
            };
            session.dispatch(&tool, request_id.as_deref(), params)
        }
        Commands::Validate => session.dispatch("validate_graph", None, Value::Null),
        Commands::Export { format } => session.dispatch(
            "export_snapshot",
            None,
            serde_json::json!({ "format": format }),
        ),
        Commands::Batches => session.dispatch("emit_impl_batches", None, Value::Null),
        Commands::Score => session.dispatch("score_ir", None, Value::Null),
    };

    process::exit(print_response(&response));
}

/// Parse tool parameters from the argument, or from stdin when it is `-`.
fn read_params(arg: &str) -> Result<Value, String> {
    let text = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read stdin: {}", e))?;
        buf
    } else {
        arg.to_string()
    };
    serde_json::from_str(&text).map_err(|e| format!("parameters are not valid JSON: {}", e))
}

/// Print the response envelope as JSON to stdout.
///
/// Returns exit code: 0 = success, 1 = the tool reported errors.
fn print_response(response: &ToolResponse) -> i32 {
    let json = serde_json::to_string_pretty(response).unwrap_or_else(|e| {
        format!("{{\"error\": \"failed to serialize response: {}\"}}", e)
    });
    println!("{}", json);
    if response.ok {
        0
    } else {
        1
    }
}
