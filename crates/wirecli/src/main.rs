// crates/wirecli/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wirecore::{
    Credential, CredentialType, ExecutionEvent, NodeSpec, NodeStatus, NodeType, RunEvent, Workflow,
};
use wireruntime::{load_workflow, Stores, WireRuntime};
use wirestore::SqliteStore;

#[derive(Parser)]
#[command(name = "wire")]
#[command(about = "Wireflow CLI", long_about = None)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Initial data as a JSON object
        #[arg(short, long)]
        input: Option<String>,

        /// Reuse an event id to resume or replay an earlier run
        #[arg(long)]
        event_id: Option<String>,

        /// SQLite database URL; runs are kept in memory when omitted
        #[arg(short, long)]
        database: Option<String>,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Manage stored credentials
    Credential {
        #[command(subcommand)]
        command: CredentialCommands,
    },

    /// Show the execution history of a workflow
    Executions {
        #[arg(short, long)]
        workflow: String,

        #[arg(short, long, default_value = "sqlite://wireflow.db")]
        database: String,
    },

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum CredentialCommands {
    /// Store a provider API key
    Add {
        #[arg(long)]
        owner: String,

        /// ANTHROPIC, OPENAI or GEMINI
        #[arg(long = "type")]
        credential_type: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        value: String,

        #[arg(short, long, default_value = "sqlite://wireflow.db")]
        database: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            file,
            input,
            event_id,
            database,
        } => {
            run_workflow(file, input, event_id, database).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(file).await?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Credential {
            command:
                CredentialCommands::Add {
                    owner,
                    credential_type,
                    name,
                    value,
                    database,
                },
        } => {
            add_credential(owner, credential_type, name, value, &database).await?;
        }

        Commands::Executions { workflow, database } => {
            list_executions(&workflow, &database).await?;
        }

        Commands::Init { output } => {
            create_example_workflow(output)?;
        }
    }

    Ok(())
}

/// Parse `--input` into the initial data of a run
fn parse_input(input: Option<&str>) -> Result<Option<Map<String, Value>>> {
    let Some(raw) = input else {
        return Ok(None);
    };

    match serde_json::from_str(raw).context("Input is not valid JSON")? {
        Value::Object(map) => Ok(Some(map)),
        _ => Err(anyhow::anyhow!("Input must be a JSON object")),
    }
}

async fn open_database(url: &str) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::connect(url)
        .await
        .with_context(|| format!("Cannot open database {}", url))?;
    Ok(Arc::new(store))
}

fn print_event(event: &ExecutionEvent) {
    match event {
        ExecutionEvent::ExecutionStarted { event_id, .. } => {
            println!("▶️  Run started (event {})", event_id);
        }
        ExecutionEvent::Status(message) => {
            let icon = match message.data.status {
                NodeStatus::Loading => "⚡",
                NodeStatus::Success => "✅",
                NodeStatus::Error => "❌",
            };
            println!(
                "  {} [{}] {} {:?}",
                icon, message.channel, message.data.node_id, message.data.status
            );
        }
        ExecutionEvent::ExecutionCompleted {
            status,
            duration_ms,
            ..
        } => {
            println!("🏁 Run finished {} in {}ms", status.as_str(), duration_ms);
        }
    }
}

async fn run_workflow(
    file: PathBuf,
    input: Option<String>,
    event_id: Option<String>,
    database: Option<String>,
) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let workflow = load_workflow(&file).await?;
    let initial_data = parse_input(input.as_deref())?;

    println!("📋 Workflow: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Connections: {}", workflow.connections.len());
    println!();

    let stores = match &database {
        Some(url) => Stores::shared(open_database(url).await?),
        None => Stores::in_memory(),
    };

    let runtime = WireRuntime::builder(wirenodes::default_registry())
        .stores(stores)
        .build();
    runtime.register_workflow(&workflow).await?;

    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            print_event(&event);
            if matches!(event, ExecutionEvent::ExecutionCompleted { .. }) {
                break;
            }
        }
    });

    let mut event = RunEvent::new(workflow.id.clone());
    if let Some(id) = event_id {
        event = event.with_id(id);
    }
    if let Some(data) = initial_data {
        event = event.with_initial_data(data);
    }

    let result = runtime.run(event).await;

    // Let the printer drain; replays publish nothing
    let _ = tokio::time::timeout(Duration::from_millis(200), event_task).await;

    let result = result?;

    println!();
    println!("📊 Execution Summary:");
    println!("   Execution ID: {}", result.execution.id);
    println!("   Event ID: {}", result.execution.event_id);
    println!("   Status: {}", result.execution.status.as_str());
    if result.replayed {
        println!("   (already completed, nothing was run)");
    }

    if !result.output.is_empty() {
        println!();
        println!("📤 Output:");
        println!("{}", serde_json::to_string_pretty(&result.output)?);
    }

    Ok(())
}

async fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow = load_workflow(&file).await?;
    let registry = wirenodes::default_registry();
    let order = wireruntime::validate_workflow(&workflow, &registry)?;

    println!("✅ Workflow is valid:");
    println!("   Name: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Connections: {}", workflow.connections.len());
    println!("   Execution order: {}", order.join(" → "));

    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let registry = wirenodes::default_registry();

    for node_type in registry.list_node_types() {
        match registry.get_metadata(node_type) {
            Some(metadata) => {
                println!("  • {} ({})", node_type, metadata.category);
                println!("    {}", metadata.description);
            }
            None => println!("  • {}", node_type),
        }
        if node_type != NodeType::Initial {
            println!("    channel: {}", node_type.status_channel());
        }
    }
}

async fn add_credential(
    owner: String,
    credential_type: String,
    name: String,
    value: String,
    database: &str,
) -> Result<()> {
    let credential_type: CredentialType = credential_type
        .to_uppercase()
        .parse()
        .map_err(anyhow::Error::msg)?;

    let credential = Credential {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: owner,
        name,
        credential_type,
        secret: value,
    };

    open_database(database).await?.insert_credential(&credential).await?;

    println!("🔑 Stored {} credential {}", credential.credential_type, credential.id);
    println!("   Reference it from a node with \"credentialId\": \"{}\"", credential.id);

    Ok(())
}

async fn list_executions(workflow_id: &str, database: &str) -> Result<()> {
    use wirecore::ExecutionStore;

    let store = open_database(database).await?;
    let executions = store.list_for_workflow(workflow_id).await?;

    if executions.is_empty() {
        println!("No executions for workflow {}", workflow_id);
        return Ok(());
    }

    println!("📜 Executions of {}:", workflow_id);
    for execution in executions {
        let finished = execution
            .completed_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}  {:<7}  started {}  finished {}  event {}",
            execution.id,
            execution.status.as_str(),
            execution.started_at.to_rfc3339(),
            finished,
            execution.event_id
        );
        if let Some(error) = execution.error {
            println!("      {}", error);
        }
    }

    Ok(())
}

fn example_workflow() -> Workflow {
    let mut workflow = Workflow::new("Example HTTP Workflow", "local");

    let trigger = workflow.add_node(
        NodeSpec::new(NodeType::ManualTrigger)
            .with_id("start")
            .with_position(0.0, 0.0),
    );
    let fetch = workflow.add_node(
        NodeSpec::new(NodeType::HttpRequest)
            .with_id("fetch")
            .with_data("variableName", "zen")
            .with_data("endpoint", "https://api.github.com/zen")
            .with_data("method", "GET")
            .with_position(250.0, 0.0),
    );
    let notify = workflow.add_node(
        NodeSpec::new(NodeType::Discord)
            .with_id("notify")
            .with_data("variableName", "notified")
            .with_data("content", "Today's zen: {{zen.httpResponse.data}}")
            .with_data("webhookUrl", "https://discord.com/api/webhooks/<id>/<token>")
            .with_position(500.0, 0.0),
    );

    workflow.connect(trigger, fetch.clone());
    workflow.connect(fetch, notify);
    workflow
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let json = serde_json::to_string_pretty(&example_workflow())?;
    std::fs::write(&output, json)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Set the Discord webhookUrl, then run it with:");
    println!("  wire run --file {}", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_must_be_an_object() {
        assert!(parse_input(None).unwrap().is_none());
        let data = parse_input(Some(r#"{"name": "Ada"}"#)).unwrap().unwrap();
        assert_eq!(data["name"], "Ada");
        assert!(parse_input(Some("[1, 2]")).is_err());
        assert!(parse_input(Some("{not json")).is_err());
    }

    #[test]
    fn example_workflow_validates() {
        let registry = wirenodes::default_registry();
        let order = wireruntime::validate_workflow(&example_workflow(), &registry).unwrap();
        assert_eq!(order, vec!["start", "fetch", "notify"]);
    }

    #[test]
    fn cli_parses_credential_add() {
        let cli = Cli::try_parse_from([
            "wire", "credential", "add", "--owner", "u1", "--type", "openai", "--name", "Main",
            "--value", "sk-1",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Credential {
                command: CredentialCommands::Add { .. }
            }
        ));
    }
}
