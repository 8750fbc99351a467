//! In-memory Codefresh and runtime doubles for unit tests

use async_trait::async_trait;
use codefresh::{Codefresh, CodefreshError};
use parking_lot::Mutex;
use runtime::{Runtime, RuntimeError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;
use venona_core::{AgentStatus, Task};

/// Hands out queued task batches, then empty ones
#[derive(Debug, Default)]
pub struct FakeCodefresh {
    batches: Mutex<VecDeque<Vec<Task>>>,
    reports: Mutex<Vec<AgentStatus>>,
    polls: AtomicUsize,
    fail_tasks: bool,
    fail_reports: bool,
}

impl FakeCodefresh {
    pub fn with_batches(batches: Vec<Vec<Task>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            fail_tasks: true,
            fail_reports: true,
            ..Self::default()
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn reports(&self) -> Vec<AgentStatus> {
        self.reports.lock().clone()
    }
}

fn unavailable() -> CodefreshError {
    CodefreshError::Api {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

#[async_trait]
impl Codefresh for FakeCodefresh {
    async fn tasks(&self) -> codefresh::Result<Vec<Task>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.fail_tasks {
            return Err(unavailable());
        }
        Ok(self.batches.lock().pop_front().unwrap_or_default())
    }

    async fn report_status(&self, status: &AgentStatus) -> codefresh::Result<()> {
        if self.fail_reports {
            return Err(unavailable());
        }
        self.reports.lock().push(status.clone());
        Ok(())
    }

    fn host(&self) -> &str {
        "https://codefresh.test"
    }
}

/// Records every batch it receives, after an optional delay
#[derive(Debug, Default)]
pub struct RecordingRuntime {
    started: Mutex<Vec<Vec<Task>>>,
    terminated: Mutex<Vec<Vec<Task>>>,
    entered: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl RecordingRuntime {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn started(&self) -> Vec<Vec<Task>> {
        self.started.lock().clone()
    }

    pub fn terminated(&self) -> Vec<Vec<Task>> {
        self.terminated.lock().clone()
    }

    /// Batches received so far, finished or not
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    async fn record(&self, log: &Mutex<Vec<Vec<Task>>>, tasks: &[Task]) -> runtime::Result<()> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        log.lock().push(tasks.to_vec());
        if self.fail {
            return Err(RuntimeError::InvalidSpec {
                task_type: tasks[0].task_type.clone(),
                reason: "rejected by test runtime".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Runtime for RecordingRuntime {
    async fn start_workflow(&self, tasks: &[Task]) -> runtime::Result<()> {
        self.record(&self.started, tasks).await
    }

    async fn terminate_workflow(&self, tasks: &[Task]) -> runtime::Result<()> {
        self.record(&self.terminated, tasks).await
    }
}

/// Polls `check` until it holds, failing the test after two seconds
pub async fn wait_until(check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}

/// In-memory log sink for a test subscriber
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
