use thiserror::Error;

pub type Result<T> = std::result::Result<T, InstallerError>;

#[derive(Error, Debug)]
pub enum InstallerError {
    #[error("Failed to render template {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("Template {name} is not a valid manifest: {source}")]
    Manifest {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("{plugin} plugin failed: {reason}")]
    Plugin { plugin: &'static str, reason: String },

    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube_api::KubeError),

    #[error("Codefresh error: {0}")]
    Codefresh(#[from] codefresh::CodefreshError),

    #[error("Configuration error: {0}")]
    Config(#[from] venona_core::VenonaError),
}
