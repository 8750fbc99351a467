//! # Venona
//!
//! The agent process: reads its configuration, starts the task scheduler
//! agent and serves its health and last status over HTTP.

pub mod config;
pub mod server;
pub mod telemetry;

pub use config::{Cli, Command, LogFormat, StartArgs};
pub use server::{router, serve};
