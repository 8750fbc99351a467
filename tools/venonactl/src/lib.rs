//! # Venonactl
//!
//! Installs the Venona agent, its runtime environment and their companions
//! into a Kubernetes cluster, registering the runtime with Codefresh.
//!
//! Every installable component is a [`Plugin`](plugins::Plugin) owning a set
//! of bundled manifest templates. Commands compose plugins with a
//! [`PluginBuilder`] and pass an explicit [`Values`] through them.

pub mod cli;
pub mod commands;
pub mod error;
pub mod plugins;
pub mod templates;
pub mod values;

pub use cli::{Cli, Command};
pub use commands::run;
pub use error::{InstallerError, Result};
pub use plugins::{Plugin, PluginBuilder, PluginType, StatusRow, Target};
pub use values::Values;
