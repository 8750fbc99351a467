//! # Task Scheduler
//!
//! The Venona agent loop. Two periodic loops share one cancellation token:
//!
//! - the poll loop fetches pending tasks from Codefresh, groups them per
//!   workflow and direction, and hands each group to its runtime
//! - the report loop sends the agent health to Codefresh and keeps the
//!   outcome as the agent's last status
//!
//! Every tick runs as a tracked worker so [`Agent::stop`] can wait for
//! in-flight work before returning.

pub mod agent;
pub mod dispatch;
pub mod error;

#[cfg(test)]
mod testing;

pub use agent::{Agent, AgentOptions, Lifecycle};
pub use dispatch::{
    dispatch, dispatch_tasks, group_tasks, plan, DispatchSummary, RuntimeMap, WorkflowCandidate,
    NO_WORKFLOW,
};
pub use error::{AgentError, Result};
