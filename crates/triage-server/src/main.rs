//! `triage-server`: serve the Triage pipeline over HTTP.

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use triage_llm::{LlmClient, LlmConfig};
use triage_pipeline::PipelineExecutor;
use triage_server::{build_router, AppState, ServerConfig};

#[derive(Parser)]
#[command(name = "triage-server", version, about = "HTTP API for LLM task prioritization")]
struct Args {
    /// Address to bind
    #[arg(long, env = "TRIAGE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "TRIAGE_PORT", default_value_t = 8000)]
    port: u16,

    /// Key clients must send in the X-API-Key header
    #[arg(long, env = "TRIAGE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::new(args.host, args.port, args.api_key);

    let llm_config = LlmConfig::from_env()?;
    let client = LlmClient::from_config(&llm_config).with_context(|| {
        format!(
            "could not build the {} client (is {} set?)",
            llm_config.provider,
            llm_config.api_key_var().unwrap_or("the API key variable")
        )
    })?;
    tracing::info!(provider = client.provider_name(), model = client.model(), "Model client ready");

    let executor = Arc::new(PipelineExecutor::with_model(Arc::new(client)));
    let app = build_router(AppState::new(executor, config.api_key.clone()));

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("failed to bind {}", config.addr()))?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
