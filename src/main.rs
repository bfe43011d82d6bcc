use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use telemux::config;
use telemux::data::{AgentId, RuntimeKind};
use telemux::orchestrator::{RuntimeMode, RuntimeOrchestrator, StdoutSink};
use telemux::telemetry::SessionTailer;

#[derive(Parser, Debug)]
#[command(name = "telemux")]
#[command(about = "Tail agent session telemetry and print UI notices as JSON lines")]
#[command(version)]
struct Args {
    /// Write a default config file and exit
    #[arg(long)]
    init: bool,

    /// Path to config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Telemetry directory (overrides config)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Runtime mode: claude-only, dual-read-claude-authoritative, pi-authoritative, pi-default
    #[arg(long)]
    mode: Option<RuntimeMode>,

    /// Record format of the session files: claude, pi
    #[arg(long)]
    runtime: Option<RuntimeKind>,

    /// Route a session to an agent, as SESSION=AGENT (repeatable)
    #[arg(long = "session", value_parser = parse_route)]
    sessions: Vec<(String, AgentId)>,
}

fn parse_route(s: &str) -> Result<(String, AgentId)> {
    let (session, agent) = s
        .split_once('=')
        .context("expected SESSION=AGENT")?;
    if session.is_empty() {
        anyhow::bail!("session id must not be empty");
    }
    let agent = agent
        .parse()
        .with_context(|| format!("invalid agent id '{}'", agent))?;
    Ok((session.to_string(), agent))
}

/// Resolve when `signal` fires. A listener that fails never resolves.
async fn shutdown_on<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::warn!("Failed to listen for ctrl-c, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries UI notices, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("telemux=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.init {
        let path = config::init(args.config.as_deref())?;
        eprintln!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = config::load(args.config.as_deref())?;

    let mut tailer_config = config.telemetry.tailer_config();
    if let Some(dir) = args.dir {
        tailer_config.dir = dir;
    }
    if let Some(runtime) = args.runtime {
        tailer_config.runtime = runtime;
    }
    let mode = args.mode.unwrap_or(config.runtime.mode);

    tracing::info!(
        "Tailing {} ({} records, mode {})",
        tailer_config.dir.display(),
        tailer_config.runtime,
        mode
    );

    let orchestrator = RuntimeOrchestrator::with_sink(mode, Box::new(StdoutSink));
    let mut tailer = SessionTailer::new(tailer_config, orchestrator);
    for (session_id, agent_id) in &args.sessions {
        tailer.register_session(session_id, *agent_id);
    }

    tailer.start();
    tailer
        .run_until(shutdown_on(tokio::signal::ctrl_c()))
        .await;
    tailer.stop();

    tracing::info!("Stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_routes() {
        assert_eq!(parse_route("abc=1").unwrap(), ("abc".to_string(), 1));
        assert!(parse_route("abc").is_err());
        assert!(parse_route("=1").is_err());
        assert!(parse_route("abc=x").is_err());
    }

    #[tokio::test]
    async fn shutdown_waits_for_signal() {
        let fired = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            shutdown_on(async { Ok(()) }),
        )
        .await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn failed_signal_listener_does_not_shut_down() {
        let fired = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            shutdown_on(async { Err(std::io::Error::other("no signal support")) }),
        )
        .await;
        assert!(fired.is_err());
    }

    #[test]
    fn cli_accepts_repeated_sessions() {
        let args = Args::parse_from([
            "telemux",
            "--mode",
            "pi-default",
            "--session",
            "a=1",
            "--session",
            "b=2",
        ]);
        assert_eq!(args.mode, Some(RuntimeMode::PiDefault));
        assert_eq!(args.sessions.len(), 2);
    }
}
