//! Agent lifecycle and its two periodic loops

use crate::dispatch::{dispatch_tasks, DispatchSummary, RuntimeMap};
use crate::error::{AgentError, Result};
use codefresh::Codefresh;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;
use venona_core::status::HEALTHY_MESSAGE;
use venona_core::{AgentStatus, Status};

pub const DEFAULT_TASK_PULLING_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_STATUS_REPORTING_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONCURRENT_DISPATCHES: usize = 4;
pub const DEFAULT_DISPATCH_COOLDOWN: Duration = Duration::from_secs(10);

/// Settings for [`Agent::new`]. Zero intervals and a zero permit count fall back to the defaults.
#[derive(Clone, Default)]
pub struct AgentOptions {
    pub id: String,
    pub codefresh: Option<Arc<dyn Codefresh>>,
    pub runtimes: RuntimeMap,
    /// Span every agent log is recorded in
    pub logger: Option<Span>,
    pub task_pulling_interval: Duration,
    pub status_reporting_interval: Duration,
    pub max_concurrent_dispatches: usize,
    /// How long a dispatch permit stays taken after its round finished
    pub dispatch_cooldown: Option<Duration>,
}

impl fmt::Debug for AgentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut runtimes: Vec<_> = self.runtimes.keys().collect();
        runtimes.sort();
        f.debug_struct("AgentOptions")
            .field("id", &self.id)
            .field("codefresh", &self.codefresh.as_ref().map(|cf| cf.host().to_string()))
            .field("runtimes", &runtimes)
            .field("task_pulling_interval", &self.task_pulling_interval)
            .field("status_reporting_interval", &self.status_reporting_interval)
            .field("max_concurrent_dispatches", &self.max_concurrent_dispatches)
            .field("dispatch_cooldown", &self.dispatch_cooldown)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Running,
    Stopped,
}

/// State the loops and their workers share
struct Shared {
    codefresh: Arc<dyn Codefresh>,
    runtimes: RuntimeMap,
    permits: Arc<Semaphore>,
    cooldown: Duration,
    last_status: RwLock<Status>,
}

impl Shared {
    async fn poll(&self) -> DispatchSummary {
        debug!("Requesting tasks from API server");
        let tasks = match self.codefresh.tasks().await {
            Ok(tasks) => tasks,
            Err(err) => {
                error!(error = %err, "Failed to fetch tasks");
                return DispatchSummary::default();
            }
        };
        if tasks.is_empty() {
            debug!("No new tasks received");
            return DispatchSummary::default();
        }

        info!(tasks = tasks.len(), "Received new tasks");
        for task in &tasks {
            debug!(task_type = %task.task_type, workflow = task.workflow(), runtime = task.runtime(), "Received task");
        }
        let summary = dispatch_tasks(tasks, &self.runtimes).await;
        debug!(dispatched = summary.dispatched, failed = summary.failed, "Dispatch round finished");
        summary
    }

    async fn report(&self) {
        let status = match self.codefresh.report_status(&AgentStatus::healthy()).await {
            Ok(()) => Status::now(HEALTHY_MESSAGE),
            Err(err) => {
                error!(error = %err, "Failed to report status");
                Status::now(format!("Failed to report status: {err}"))
            }
        };
        *self.last_status.write() = status;
    }
}

/// Pulls tasks from Codefresh and hands them to runtimes until stopped.
///
/// An agent runs once: after [`Agent::stop`] it cannot be started again.
pub struct Agent {
    id: String,
    span: Span,
    task_pulling_interval: Duration,
    status_reporting_interval: Duration,
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
    loops: Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
    workers: TaskTracker,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("lifecycle", &*self.lifecycle.lock())
            .field("task_pulling_interval", &self.task_pulling_interval)
            .field("status_reporting_interval", &self.status_reporting_interval)
            .field("in_flight", &self.workers.len())
            .finish()
    }
}

impl Agent {
    pub fn new(options: Option<AgentOptions>) -> Result<Self> {
        let options = options.ok_or(AgentError::OptionsRequired)?;
        if options.id.is_empty() {
            return Err(AgentError::IdRequired);
        }
        let codefresh = options.codefresh.ok_or(AgentError::ClientRequired)?;
        if options.runtimes.is_empty() {
            return Err(AgentError::RuntimesRequired);
        }
        let span = options.logger.ok_or(AgentError::LoggerRequired)?;

        let permits = match options.max_concurrent_dispatches {
            0 => DEFAULT_MAX_CONCURRENT_DISPATCHES,
            n if n > Semaphore::MAX_PERMITS => {
                return Err(AgentError::InvalidOption {
                    name: "max_concurrent_dispatches",
                    reason: format!("{n} exceeds the limit of {}", Semaphore::MAX_PERMITS),
                });
            }
            n => n,
        };
        let task_pulling_interval = schedulable(
            "task_pulling_interval",
            or_default(options.task_pulling_interval, DEFAULT_TASK_PULLING_INTERVAL),
        )?;
        let status_reporting_interval = schedulable(
            "status_reporting_interval",
            or_default(options.status_reporting_interval, DEFAULT_STATUS_REPORTING_INTERVAL),
        )?;
        Ok(Self {
            id: options.id,
            span,
            task_pulling_interval,
            status_reporting_interval,
            shared: Arc::new(Shared {
                codefresh,
                runtimes: options.runtimes,
                permits: Arc::new(Semaphore::new(permits)),
                cooldown: options.dispatch_cooldown.unwrap_or(DEFAULT_DISPATCH_COOLDOWN),
                last_status: RwLock::new(Status::default()),
            }),
            lifecycle: Mutex::new(Lifecycle::Created),
            loops: Mutex::new(Vec::new()),
            shutdown: CancellationToken::new(),
            workers: TaskTracker::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock()
    }

    /// Spawns both loops, then reports status once before returning
    pub async fn start(&self) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if *lifecycle != Lifecycle::Created {
                return Err(AgentError::AlreadyRunning);
            }
            *lifecycle = Lifecycle::Running;
        }
        info!(parent: &self.span, agent = %self.id, "Starting agent");

        let poll = tokio::spawn(
            poll_loop(
                self.shared.clone(),
                self.workers.clone(),
                self.shutdown.clone(),
                self.task_pulling_interval,
            )
            .instrument(self.span.clone()),
        );
        let report = tokio::spawn(
            report_loop(
                self.shared.clone(),
                self.workers.clone(),
                self.shutdown.clone(),
                self.status_reporting_interval,
            )
            .instrument(self.span.clone()),
        );
        self.loops.lock().extend([poll, report]);

        self.shared.report().instrument(self.span.clone()).await;
        Ok(())
    }

    /// Stops both loops and waits for every in-flight worker, cooldown included
    pub async fn stop(&self) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if *lifecycle != Lifecycle::Running {
                return Err(AgentError::AlreadyStopped);
            }
            *lifecycle = Lifecycle::Stopped;
        }
        warn!(parent: &self.span, "Received graceful termination request, stopping tasks...");

        self.shutdown.cancel();
        let loops = std::mem::take(&mut *self.loops.lock());
        for handle in loops {
            if let Err(err) = handle.await {
                error!(parent: &self.span, error = %err, "Agent loop ended abnormally");
            }
        }

        self.workers.close();
        debug!(parent: &self.span, in_flight = self.workers.len(), "Waiting for in-flight work");
        self.workers.wait().await;
        info!(parent: &self.span, agent = %self.id, "Agent stopped");
        Ok(())
    }

    /// Outcome of the latest status report
    pub fn status(&self) -> Status {
        self.shared.last_status.read().clone()
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Loops start their tickers one period from now, so the deadline must be representable
fn schedulable(name: &'static str, period: Duration) -> Result<Duration> {
    match Instant::now().checked_add(period) {
        Some(_) => Ok(period),
        None => Err(AgentError::InvalidOption {
            name,
            reason: format!("{period:?} is too long to schedule"),
        }),
    }
}

fn or_default(value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        default
    } else {
        value
    }
}

async fn poll_loop(shared: Arc<Shared>, workers: TaskTracker, shutdown: CancellationToken, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let Ok(permit) = shared.permits.clone().try_acquire_owned() else {
                    debug!("All dispatch permits taken, skipping tick");
                    continue;
                };
                let shared = shared.clone();
                let cycle = info_span!("poll", cycle = %Uuid::new_v4());
                workers.spawn(
                    async move {
                        shared.poll().await;
                        tokio::time::sleep(shared.cooldown).await;
                        drop(permit);
                    }
                    .instrument(cycle),
                );
            }
        }
    }
    debug!("Task polling stopped");
}

async fn report_loop(shared: Arc<Shared>, workers: TaskTracker, shutdown: CancellationToken, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let shared = shared.clone();
                workers.spawn(async move { shared.report().await }.in_current_span());
            }
        }
    }
    debug!("Status reporting stopped");
}
