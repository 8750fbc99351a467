//! Minimal Kubernetes REST client
//!
//! Covers what Venona needs from a cluster: create, read and delete the
//! objects found in rendered manifests and in task specs.

mod client;
mod config;
mod error;
mod resource;

pub use client::{KubeClient, ObjectRef};
pub use config::KubeConfig;
pub use error::{KubeError, Result};
pub use resource::ApiResource;
