//! CLI binary for prioritizing task lists locally or against a running server.

mod client;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;
use triage_llm::LlmClient;
use triage_pipeline::{EventEmitter, PipelineExecutor};

use crate::client::RemoteClient;

#[derive(Parser)]
#[command(name = "triage", version, about = "Turn free-form task lists into a prioritized plan")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline in-process against the configured model
    Run {
        /// Task list text (reads stdin when omitted)
        text: Option<String>,

        /// Read the task list from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Print the full final state as JSON instead of the formatted output
        #[arg(long)]
        json: bool,

        /// Stream run events to stderr as JSON lines
        #[arg(long)]
        events: bool,
    },

    /// Print the pipeline topology
    Graph {
        #[arg(long, value_enum, default_value_t = GraphFormat::Mermaid)]
        format: GraphFormat,
    },

    /// Send a task list to a running triage-server
    Remote {
        /// Task list text (reads stdin when omitted)
        text: Option<String>,

        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Server base URL
        #[arg(long, env = "TRIAGE_URL", default_value = "http://localhost:8000")]
        url: String,

        /// Value for the X-API-Key header
        #[arg(long, env = "TRIAGE_API_KEY", hide_env_values = true, default_value = "dev-api-key-change-me")]
        api_key: String,

        /// Print the response body as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that a triage-server is up
    Health {
        #[arg(long, env = "TRIAGE_URL", default_value = "http://localhost:8000")]
        url: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum GraphFormat {
    Mermaid,
    Dot,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            text,
            file,
            json,
            events,
        } => {
            let input = read_input(text, file.as_deref()).await?;
            cmd_run(input, json, events).await?;
        }
        Commands::Graph { format } => cmd_graph(format),
        Commands::Remote {
            text,
            file,
            url,
            api_key,
            json,
        } => {
            let input = read_input(text, file.as_deref()).await?;
            cmd_remote(&url, &api_key, &input, json).await?;
        }
        Commands::Health { url } => cmd_health(&url).await?,
    }

    Ok(())
}

/// Input precedence: positional text, then `--file`, then stdin.
async fn read_input(text: Option<String>, file: Option<&Path>) -> anyhow::Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .context("failed to read stdin")?;
    Ok(buf)
}

async fn cmd_run(input: String, json: bool, events: bool) -> anyhow::Result<()> {
    let client = LlmClient::from_env().context("could not configure the model client")?;
    tracing::debug!(provider = client.provider_name(), model = client.model(), "Model client ready");

    let mut executor = PipelineExecutor::with_model(Arc::new(client));
    let printer = if events {
        let emitter = EventEmitter::default();
        let mut rx = emitter.subscribe();
        executor = executor.with_events(emitter);
        Some(tokio::spawn(async move {
            // Ends once the executor (and with it the sender) is dropped.
            while let Ok(event) = rx.recv().await {
                if let Ok(line) = serde_json::to_string(&event) {
                    eprintln!("{line}");
                }
            }
        }))
    } else {
        None
    };

    let result = executor.run(input).await;
    drop(executor);
    if let Some(handle) = printer {
        let _ = handle.await;
    }
    let run = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run.final_state)?);
    } else {
        println!("{}", run.output());
    }

    if !run.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_graph(format: GraphFormat) {
    let rendered = match format {
        GraphFormat::Mermaid => triage_pipeline::to_mermaid(),
        GraphFormat::Dot => triage_pipeline::to_dot(),
    };
    println!("{rendered}");
}

async fn cmd_remote(url: &str, api_key: &str, input: &str, json: bool) -> anyhow::Result<()> {
    let result = RemoteClient::new(url, api_key).prioritize(input).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.output);
    }

    if !result.errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_health(url: &str) -> anyhow::Result<()> {
    if RemoteClient::new(url, "").health().await? {
        println!("ok");
        Ok(())
    } else {
        anyhow::bail!("{url} is not healthy")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_run_with_file() {
        let cli = Cli::try_parse_from(["triage", "run", "--file", "tasks.txt", "--json"]).unwrap();
        match cli.command {
            Commands::Run { text, file, json, events } => {
                assert!(text.is_none());
                assert_eq!(file.unwrap(), PathBuf::from("tasks.txt"));
                assert!(json);
                assert!(!events);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn text_and_file_conflict() {
        assert!(Cli::try_parse_from(["triage", "run", "do laundry", "--file", "x"]).is_err());
    }

    #[test]
    fn graph_format_defaults_to_mermaid() {
        let cli = Cli::try_parse_from(["triage", "graph"]).unwrap();
        assert!(matches!(cli.command, Commands::Graph { format: GraphFormat::Mermaid }));

        let cli = Cli::try_parse_from(["triage", "graph", "--format", "dot"]).unwrap();
        assert!(matches!(cli.command, Commands::Graph { format: GraphFormat::Dot }));
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["triage", "graph", "-v"]).unwrap();
        assert!(cli.verbose);
    }

    #[tokio::test]
    async fn positional_text_wins() {
        let input = read_input(Some("call mom".into()), None).await.unwrap();
        assert_eq!(input, "call mom");
    }

    #[tokio::test]
    async fn reads_file_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Review PRs #work").unwrap();
        writeln!(file, "Buy milk tomorrow").unwrap();

        let input = read_input(None, Some(file.path())).await.unwrap();
        assert_eq!(input, "Review PRs #work\nBuy milk tomorrow\n");
    }

    #[tokio::test]
    async fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        let err = read_input(None, Some(&path)).await.unwrap_err();
        assert!(err.to_string().contains("nope.txt"));
    }
}
