use thiserror::Error;

pub type Result<T> = std::result::Result<T, KubeError>;

#[derive(Error, Debug)]
pub enum KubeError {
    #[error("{kind} \"{name}\" already exists")]
    AlreadyExists { kind: String, name: String },

    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    #[error("Kubernetes API responded with status {status} ({reason}): {message}")]
    Api {
        status: u16,
        reason: String,
        message: String,
    },

    #[error("Unsupported object kind {kind} ({api_version})")]
    UnsupportedKind { api_version: String, kind: String },

    #[error("Invalid object: {reason}")]
    InvalidObject { reason: String },

    #[error("Invalid cluster configuration: {reason}")]
    Config { reason: String },

    #[error("Request to Kubernetes failed: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid kubeconfig: {source}")]
    Kubeconfig {
        #[from]
        source: serde_yaml::Error,
    },

    #[error("Failed to decode Kubernetes response: {source}")]
    Decode {
        #[from]
        source: serde_json::Error,
    },
}

impl KubeError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, KubeError::AlreadyExists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, KubeError::NotFound { .. })
    }
}
