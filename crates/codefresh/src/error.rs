use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodefreshError>;

#[derive(Error, Debug)]
pub enum CodefreshError {
    #[error("Codefresh API responded with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid Codefresh host {host}: {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Request to Codefresh failed: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },

    #[error("Failed to decode Codefresh response: {source}")]
    Decode {
        #[from]
        source: serde_json::Error,
    },
}
