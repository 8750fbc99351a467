//! Codefresh API clients
//!
//! [`CodefreshClient`] is what the agent uses to pull tasks and report its
//! status. [`ClusterApi`] is used by the installer to validate, sign and
//! register a runtime environment.

mod agent;
mod clusters;
mod error;
mod transport;

pub use agent::{Codefresh, CodefreshClient, Options};
pub use clusters::{
    ClusterApi, ClusterApiOptions, RegisterRequest, RuntimeEnvironment, RuntimeEnvironmentMetadata,
    ServerCert, ValidateRequest,
};
pub use error::{CodefreshError, Result};

pub use venona_core::endpoints::DEFAULT_CODEFRESH_HOST;
