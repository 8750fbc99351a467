use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent options are required")]
    OptionsRequired,

    #[error("Agent id is required")]
    IdRequired,

    #[error("Codefresh client is required")]
    ClientRequired,

    #[error("At least one runtime is required")]
    RuntimesRequired,

    #[error("Logger is required")]
    LoggerRequired,

    #[error("Invalid {name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },

    #[error("Agent is already running")]
    AlreadyRunning,

    #[error("Agent is already stopped")]
    AlreadyStopped,

    #[error("Runtime {runtime} of workflow {workflow} is not configured")]
    UnknownRuntime { runtime: String, workflow: String },

    #[error("Workflow {workflow} targets more than one runtime: {}", runtimes.join(", "))]
    MixedRuntimes {
        workflow: String,
        runtimes: Vec<String>,
    },

    #[error("Runtime {runtime} failed on workflow {workflow}: {source}")]
    Dispatch {
        runtime: String,
        workflow: String,
        #[source]
        source: runtime::RuntimeError,
    },
}
