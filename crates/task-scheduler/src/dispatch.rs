//! Task classification, workflow grouping and fan-out to runtimes

use crate::error::{AgentError, Result};
use runtime::Runtime;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use venona_core::{Direction, Task};

/// Runtimes by name, as referenced by a task's `reName`
pub type RuntimeMap = HashMap<String, Arc<dyn Runtime>>;

/// Group name for tasks that carry no workflow
pub const NO_WORKFLOW: &str = "_";

/// Tasks of one workflow and one direction, bound for a single runtime
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowCandidate {
    pub workflow: String,
    pub runtime: String,
    pub direction: Direction,
    pub tasks: Vec<Task>,
}

/// Outcome of one dispatch round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub dispatched: usize,
    pub failed: usize,
}

pub fn workflow_key(workflow: &str) -> &str {
    if workflow.is_empty() {
        NO_WORKFLOW
    } else {
        workflow
    }
}

/// Tasks grouped by workflow in order of first appearance
#[derive(Debug, Default)]
struct Groups {
    index: HashMap<String, usize>,
    groups: Vec<(String, Vec<Task>)>,
}

impl Groups {
    fn push(&mut self, task: Task) {
        let key = workflow_key(task.workflow());
        let slot = match self.index.get(key) {
            Some(slot) => *slot,
            None => {
                self.groups.push((key.to_string(), Vec::new()));
                self.index.insert(key.to_string(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        self.groups[slot].1.push(task);
    }
}

/// Groups tasks by workflow name, keeping the relative order of the tasks
pub fn group_tasks(tasks: Vec<Task>) -> Vec<(String, Vec<Task>)> {
    let mut groups = Groups::default();
    for task in tasks {
        groups.push(task);
    }
    groups.groups
}

/// Splits tasks into creation and deletion groups per workflow.
///
/// Creation groups come first. Task types without a direction are dropped.
/// A group whose tasks name different runtimes yields `MixedRuntimes`.
pub fn plan(tasks: Vec<Task>) -> Vec<Result<WorkflowCandidate>> {
    let mut creation = Vec::new();
    let mut deletion = Vec::new();
    for task in tasks {
        match task.task_type.direction() {
            Some(Direction::Creation) => creation.push(task),
            Some(Direction::Deletion) => deletion.push(task),
            None => debug!(task_type = %task.task_type, workflow = task.workflow(), "Skipping task"),
        }
    }

    [(Direction::Creation, creation), (Direction::Deletion, deletion)]
        .into_iter()
        .flat_map(|(direction, tasks)| {
            group_tasks(tasks)
                .into_iter()
                .map(move |(workflow, tasks)| candidate(direction, workflow, tasks))
        })
        .collect()
}

fn candidate(direction: Direction, workflow: String, tasks: Vec<Task>) -> Result<WorkflowCandidate> {
    let mut runtimes: Vec<String> = Vec::new();
    for task in &tasks {
        if !runtimes.iter().any(|name| name == task.runtime()) {
            runtimes.push(task.runtime().to_string());
        }
    }
    if runtimes.len() > 1 {
        return Err(AgentError::MixedRuntimes { workflow, runtimes });
    }
    Ok(WorkflowCandidate {
        workflow,
        runtime: runtimes.pop().unwrap_or_default(),
        direction,
        tasks,
    })
}

/// Hands one candidate to the runtime it targets
pub async fn dispatch(candidate: &WorkflowCandidate, runtimes: &RuntimeMap) -> Result<()> {
    let runtime = runtimes
        .get(&candidate.runtime)
        .ok_or_else(|| AgentError::UnknownRuntime {
            runtime: candidate.runtime.clone(),
            workflow: candidate.workflow.clone(),
        })?;

    let result = match candidate.direction {
        Direction::Creation => {
            info!(workflow = %candidate.workflow, runtime = %candidate.runtime, tasks = candidate.tasks.len(), "Starting workflow");
            runtime.start_workflow(&candidate.tasks).await
        }
        Direction::Deletion => {
            info!(workflow = %candidate.workflow, runtime = %candidate.runtime, tasks = candidate.tasks.len(), "Terminating workflow");
            runtime.terminate_workflow(&candidate.tasks).await
        }
    };
    result.map_err(|source| AgentError::Dispatch {
        runtime: candidate.runtime.clone(),
        workflow: candidate.workflow.clone(),
        source,
    })
}

/// Plans and dispatches all tasks. Failing groups are logged and do not stop the others.
pub async fn dispatch_tasks(tasks: Vec<Task>, runtimes: &RuntimeMap) -> DispatchSummary {
    let mut summary = DispatchSummary::default();
    for planned in plan(tasks) {
        let outcome = match planned {
            Ok(candidate) => dispatch(&candidate, runtimes).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(()) => summary.dispatched += 1,
            Err(err) => {
                error!(error = %err, "Workflow dispatch failed");
                summary.failed += 1;
            }
        }
    }
    summary
}
