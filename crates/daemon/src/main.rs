// claused: headless editor core driven over stdin/stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clause_daemon::agent::{pump_stderr, pump_stream_json, StreamJsonBackend};
use clause_daemon::config::EditorConfig;
use clause_daemon::control::serve_control;
use clause_daemon::document::DocumentCommand;
use clause_daemon::runtime::RuntimeHandle;
use tokio::sync::mpsc;
use tracing::info;

const AGENT_EVENT_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(name = "claused", about = "Document sync and assistant transcript core")]
struct Args {
    /// Workspace directory to watch.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Document to open on startup, relative to the root.
    #[arg(long)]
    open: Option<PathBuf>,
    /// Config file (defaults to ~/.clause/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Pipe the assistant reads stream-json turns from.
    #[arg(long, requires = "assistant_output")]
    assistant_input: Option<PathBuf>,
    /// Pipe the assistant writes stream-json events to.
    #[arg(long, requires = "assistant_input")]
    assistant_output: Option<PathBuf>,
    /// Pipe carrying the assistant's stderr.
    #[arg(long, requires = "assistant_output")]
    assistant_stderr: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries control updates; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EditorConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EditorConfig::load(),
    };

    let mut runtime = RuntimeHandle::start(config, &args.root)
        .with_context(|| format!("failed to start runtime for {}", args.root.display()))?;

    if let (Some(input), Some(output)) = (&args.assistant_input, &args.assistant_output) {
        let writer = tokio::fs::OpenOptions::new()
            .write(true)
            .open(input)
            .await
            .with_context(|| format!("failed to open assistant input {}", input.display()))?;
        let reader = tokio::fs::File::open(output)
            .await
            .with_context(|| format!("failed to open assistant output {}", output.display()))?;

        let (events_tx, events_rx) = mpsc::channel(AGENT_EVENT_CAPACITY);
        if let Some(stderr) = &args.assistant_stderr {
            let stderr = tokio::fs::File::open(stderr)
                .await
                .with_context(|| format!("failed to open assistant stderr {}", stderr.display()))?;
            tokio::spawn(pump_stderr(stderr, events_tx.clone()));
        }
        tokio::spawn(pump_stream_json(reader, events_tx));
        let program = runtime.config().assistant.program.clone();
        runtime.attach_assistant(Arc::new(StreamJsonBackend::new(writer, program)), events_rx).await;
    }

    if let Some(path) = args.open {
        runtime.document(DocumentCommand::Open(path)).await?;
    }

    info!(root = %runtime.root().display(), "claused ready");
    tokio::select! {
        result = serve_control(&runtime, tokio::io::stdin(), tokio::io::stdout()) => {
            result.context("control channel failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
        }
    }

    runtime.wait().await;
    Ok(())
}
