//! # Venona Agent
//!
//! Pulls workflow tasks from Codefresh and runs them on the configured
//! Kubernetes runtimes.

use anyhow::Context;
use clap::Parser;
use codefresh::CodefreshClient;
use std::sync::Arc;
use task_scheduler::Agent;
use tracing::{info, info_span, warn};
use venona::{serve, telemetry, Cli, Command, StartArgs};
use venona_core::BUILD_INFO;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Version => {
            println!("{BUILD_INFO}");
            Ok(())
        }
        Command::Start(args) => start(args).await,
    }
}

async fn start(args: StartArgs) -> anyhow::Result<()> {
    telemetry::init(args.verbose, args.log_format)?;
    info!("Starting {}", BUILD_INFO);

    let runtimes = args.load_runtimes()?;
    let codefresh = CodefreshClient::new(args.codefresh_options())
        .context("Failed to create Codefresh client")?;
    let logger = info_span!("agent", agent_id = %args.agent_id);
    let agent = Arc::new(
        Agent::new(Some(args.agent_options(Arc::new(codefresh), runtimes, logger)))
            .context("Failed to create agent")?,
    );
    serve(agent, args.port, shutdown_signal()).await?;
    info!("Venona stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
