//! Command handlers

use crate::cli::{Cli, Command, FullInstallArgs, GlobalArgs, InstallTarget, RuntimeArgs, TargetArgs};
use crate::error::{InstallerError, Result};
use crate::plugins::{InstallOptions, PluginBuilder, StatusRow, Target};
use crate::values::Values;
use anyhow::{bail, Context};
use comfy_table::Table;
use kube_api::{KubeClient, KubeConfig, KubeError};
use tracing::{info, warn};
use venona_core::RuntimeConfig;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli { global, command } = cli;
    match command {
        Command::Install(args) => match args.target {
            Some(InstallTarget::Runtime(runtime)) => install_runtime(&global, runtime).await,
            None => install_full(&global, args.full).await,
        },
        Command::Status(args) => print_status(&global, args).await,
        Command::Delete(args) => uninstall(&global, args).await,
    }
}

async fn install_full(global: &GlobalArgs, args: FullInstallArgs) -> anyhow::Result<()> {
    let mut values = args.values(global);
    if args.installs_agent() && (values.agent_id.is_empty() || values.agent_token.is_empty()) {
        bail!("--agent-id and --agent-token are required to install the agent");
    }
    let plugins = args.plugins(&values);
    let target = connect(&mut values).context("Failed to connect to Kubernetes")?;
    let opt = InstallOptions {
        target,
        dry_run: values.dry_run,
        codefresh: global.codefresh_options(&values.codefresh_token),
        cluster_name: values.cluster_name.clone(),
        mark_as_default: args.set_default,
        register_with_agent: true,
        kubernetes_runner_type: values.kubernetes_runner_type,
    };

    let values = install(plugins, &opt, values).await?;
    report_installed(&values);
    Ok(())
}

async fn install_runtime(global: &GlobalArgs, args: RuntimeArgs) -> anyhow::Result<()> {
    let mut values = args.values(global);
    let plugins = args.plugins(&values);
    let target = connect(&mut values).context("Failed to connect to Kubernetes")?;
    let opt = InstallOptions {
        target,
        dry_run: values.dry_run,
        codefresh: global.codefresh_options(&values.codefresh_token),
        cluster_name: values.cluster_name.clone(),
        mark_as_default: false,
        register_with_agent: true,
        kubernetes_runner_type: values.kubernetes_runner_type,
    };

    let values = install(plugins, &opt, values).await?;
    report_installed(&values);
    Ok(())
}

async fn print_status(global: &GlobalArgs, args: TargetArgs) -> anyhow::Result<()> {
    let mut values = args.values(global);
    let target = connect(&mut values).context("Failed to connect to Kubernetes")?;
    let rows = status(args.plugins(&values), &target, &values).await?;
    println!("{}", status_table(&rows));
    Ok(())
}

async fn uninstall(global: &GlobalArgs, args: TargetArgs) -> anyhow::Result<()> {
    let mut values = args.values(global);
    let target = connect(&mut values).context("Failed to connect to Kubernetes")?;
    delete(args.plugins(&values), &target, &values).await?;
    println!("🗑️  Deleted Venona from namespace {}", target.namespace);
    Ok(())
}

fn report_installed(values: &Values) {
    if values.dry_run {
        return;
    }
    if values.runtime_environment.is_empty() {
        println!("✅ Installation completed in namespace {}", values.namespace);
    } else {
        println!(
            "✅ Installation completed, runtime environment: {}",
            values.runtime_environment
        );
    }
}

/// Loads the cluster connection and records it as the agent's runtime cluster
pub fn connect(values: &mut Values) -> Result<Target> {
    let config = if values.in_cluster {
        KubeConfig::in_cluster()?
    } else {
        let path = values
            .kubeconfig_path
            .clone()
            .or_else(KubeConfig::default_path)
            .ok_or_else(|| KubeError::Config {
                reason: "no kubeconfig found, pass --kubeconfig".to_string(),
            })?;
        values.kubeconfig_path = Some(path.clone());
        KubeConfig::from_kubeconfig(&path, Some(values.context.as_str()))?
    };

    if values.runtime_cluster.is_none() {
        if config.token.is_none() {
            warn!("Cluster credentials carry no token, the agent will not be able to reach the runtime");
        }
        values.runtime_cluster = Some(RuntimeConfig {
            host: config.server.to_string(),
            token: config.token.clone().unwrap_or_default(),
            crt: config
                .ca_pem
                .as_ref()
                .map(|pem| String::from_utf8_lossy(pem).into_owned()),
            namespace: Some(values.namespace.clone()),
        });
    }

    let namespace = values.namespace.clone();
    let kube = KubeClient::new(config.with_namespace(namespace.clone()))?;
    info!(server = %kube.server(), namespace = %namespace, "Connected to Kubernetes");
    Ok(Target { kube, namespace })
}

/// Runs the plugins in order, threading the values through them
pub async fn install(plugins: PluginBuilder, opt: &InstallOptions, mut values: Values) -> Result<Values> {
    for plugin in plugins.get() {
        info!(plugin = plugin.name(), "Installing");
        values = plugin.install(opt, values).await?;
    }
    Ok(values)
}

pub async fn status(plugins: PluginBuilder, target: &Target, values: &Values) -> Result<Vec<StatusRow>> {
    let mut rows = Vec::new();
    for plugin in plugins.get() {
        rows.extend(plugin.status(target, values).await?);
    }
    Ok(rows)
}

/// Deletes in reverse plugin order, the agent before its runtime
pub async fn delete(plugins: PluginBuilder, target: &Target, values: &Values) -> Result<()> {
    let mut errors = Vec::new();
    for plugin in plugins.get().into_iter().rev() {
        info!(plugin = plugin.name(), "Deleting");
        if let Err(err) = plugin.delete(target, values).await {
            warn!(plugin = plugin.name(), error = %err, "Delete failed");
            errors.push(format!("{}: {err}", plugin.name()));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(InstallerError::Plugin {
            plugin: "delete",
            reason: errors.join("; "),
        })
    }
}

pub fn status_table(rows: &[StatusRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Kind", "Name", "Status", "Message"]);
    for row in rows {
        table.add_row(vec![
            row.kind.as_str(),
            row.name.as_str(),
            row.status.as_str(),
            row.message.as_str(),
        ]);
    }
    table
}
