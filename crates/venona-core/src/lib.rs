//! # Venona Core
//!
//! Core types shared by the Venona runtime agent and the `venonactl` installer.
//!
//! ## Venona Agent
//! - Pulls pending tasks from the Codefresh control plane
//! - Groups tasks by workflow and hands them to the runtime they target
//! - Reports its health back on a fixed interval
//!
//! ## Venonactl
//! - Renders and applies the runtime manifests to a cluster
//! - Registers the runtime environment with Codefresh

pub mod config;
pub mod error;
pub mod status;
pub mod task;

pub use config::{RuntimeConfig, RuntimesConfig};
pub use error::{Result, VenonaError};
pub use status::{AgentStatus, Status};
pub use task::{Direction, Metadata, Task, TaskType};

/// Current Venona version, sent to Codefresh with every agent request
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Venona build information for logs and the status endpoint
pub const BUILD_INFO: &str = concat!(
    "Venona ",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_NAME"),
    ")"
);

/// Codefresh and agent HTTP endpoints
pub mod endpoints {
    pub const DEFAULT_CODEFRESH_HOST: &str = "https://g.codefresh.io";

    pub const HEALTH: &str = "/health";
    pub const STATUS: &str = "/status";

    pub const API_CUSTOM_CLUSTERS_VALIDATE: &str = "/api/custom_clusters/validate";
    pub const API_CUSTOM_CLUSTERS_REGISTER: &str = "/api/custom_clusters/register";

    /// Tasks waiting for the given agent
    pub fn agent_tasks(agent_id: &str) -> String {
        format!("/api/agent/{agent_id}/tasks")
    }

    /// Status entity of the given agent
    pub fn agent_status(agent_id: &str) -> String {
        format!("/api/agent/{agent_id}/status")
    }

    /// Server certificate signing for a cluster
    pub fn cluster_tls(cluster: &str) -> String {
        format!("/api/custom_clusters/{cluster}/tls")
    }
}
