//! Command line and environment configuration of the agent process

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use codefresh::Codefresh;
use runtime::{KubernetesRuntime, Runtime};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use task_scheduler::{AgentOptions, RuntimeMap};
use tracing::{info, Span};
use venona_core::{endpoints, RuntimesConfig};

#[derive(Debug, Parser)]
#[command(name = "venona", version, about = "Codefresh runtime agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start pulling and running workflow tasks
    Start(StartArgs),
    /// Print build information
    Version,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct StartArgs {
    #[arg(long, env = "CODEFRESH_HOST", default_value = endpoints::DEFAULT_CODEFRESH_HOST)]
    pub codefresh_host: String,

    #[arg(long, env = "CODEFRESH_TOKEN", hide_env_values = true)]
    pub codefresh_token: String,

    #[arg(long, env = "AGENT_ID")]
    pub agent_id: String,

    /// Runtimes file written by venonactl
    #[arg(long, env = "VENONA_CONFIG")]
    pub config: PathBuf,

    /// Seconds between task polls
    #[arg(long, default_value_t = 3)]
    pub task_pulling_interval: u64,

    /// Seconds between status reports
    #[arg(long, default_value_t = 10)]
    pub status_reporting_interval: u64,

    #[arg(long, default_value_t = 4)]
    pub max_concurrent_dispatches: usize,

    /// Seconds a dispatch slot stays taken after a poll round
    #[arg(long, default_value_t = 10)]
    pub dispatch_cooldown: u64,

    /// Port of the health and status server
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Skip TLS verification of the Codefresh host
    #[arg(long)]
    pub insecure: bool,

    #[arg(long, short)]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl StartArgs {
    pub fn codefresh_options(&self) -> codefresh::Options {
        codefresh::Options {
            host: self.codefresh_host.clone(),
            token: self.codefresh_token.clone(),
            agent_id: self.agent_id.clone(),
            insecure: self.insecure,
            timeout: None,
        }
    }

    /// One Kubernetes runtime per entry of the runtimes file
    pub fn load_runtimes(&self) -> anyhow::Result<RuntimeMap> {
        let config = RuntimesConfig::from_file(&self.config)
            .with_context(|| format!("Failed to load runtimes from {}", self.config.display()))?;

        let mut runtimes = RuntimeMap::new();
        for (name, settings) in &config.runtimes {
            let runtime = KubernetesRuntime::from_config(name, settings)
                .with_context(|| format!("Failed to set up runtime {name}"))?;
            info!(runtime = %name, host = %settings.host, "Runtime loaded");
            runtimes.insert(name.clone(), Arc::new(runtime) as Arc<dyn Runtime>);
        }
        Ok(runtimes)
    }

    pub fn agent_options(
        &self,
        codefresh: Arc<dyn Codefresh>,
        runtimes: RuntimeMap,
        logger: Span,
    ) -> AgentOptions {
        AgentOptions {
            id: self.agent_id.clone(),
            codefresh: Some(codefresh),
            runtimes,
            logger: Some(logger),
            task_pulling_interval: Duration::from_secs(self.task_pulling_interval),
            status_reporting_interval: Duration::from_secs(self.status_reporting_interval),
            max_concurrent_dispatches: self.max_concurrent_dispatches,
            dispatch_cooldown: Some(Duration::from_secs(self.dispatch_cooldown)),
        }
    }
}
