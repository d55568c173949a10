// ── Fixed-size worker pool ──
//
// `min(concurrency, jobs)` workers drain a shared queue. Each job yields a
// value that stays with its worker until the pool finishes; results come
// back in job order. Nothing is written while workers run.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    /// A pool with at most `concurrency` workers (minimum 1).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Workers that would be spawned for `jobs` jobs.
    pub fn workers_for(&self, jobs: usize) -> usize {
        self.concurrency.min(jobs)
    }

    /// Run `worker` over every job and collect the results in job order.
    pub async fn run<J, T, F, Fut>(&self, jobs: Vec<J>, worker: F) -> Result<Vec<T>, CoreError>
    where
        J: Send + 'static,
        T: Send + 'static,
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let total = jobs.len();
        let workers = self.workers_for(total);
        if workers == 0 {
            return Ok(Vec::new());
        }
        debug!(jobs = total, workers, "starting worker pool");

        let queue: Arc<Mutex<VecDeque<(usize, J)>>> =
            Arc::new(Mutex::new(jobs.into_iter().enumerate().collect()));
        let worker = Arc::new(worker);
        let mut tasks = JoinSet::new();

        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let worker = Arc::clone(&worker);
            tasks.spawn(async move {
                let mut done = Vec::new();
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((index, job)) = next else { break };
                    done.push((index, worker(job).await));
                }
                done
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            let done = joined.map_err(|e| CoreError::Internal(format!("worker failed: {e}")))?;
            results.extend(done);
        }
        results.sort_by_key(|(index, _)| *index);
        info!(jobs = total, "worker pool finished");
        Ok(results.into_iter().map(|(_, value)| value).collect())
    }
}

/// Result of one job: what it ran against and how it went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub key: String,
    pub success: bool,
    pub detail: String,
}

impl JobOutcome {
    pub fn ok(key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            success: true,
            detail: detail.into(),
        }
    }

    pub fn failed(key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            success: false,
            detail: detail.into(),
        }
    }

    fn log_line(&self) -> String {
        let detail = self.detail.trim();
        if detail.is_empty() {
            self.key.clone()
        } else {
            format!("{}: {}", self.key, detail.replace(['\r', '\n'], " "))
        }
    }
}

/// Success and failure logs, written once all jobs are done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobLog {
    pub succeeded: usize,
    pub failed: usize,
}

impl JobLog {
    pub fn tally(outcomes: &[JobOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        Self {
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }

    /// Write one line per outcome to the matching file. Both files are
    /// always created, possibly empty.
    pub fn write(
        outcomes: &[JobOutcome],
        success_path: &Path,
        failure_path: &Path,
    ) -> Result<Self, CoreError> {
        let mut ok = String::new();
        let mut failed = String::new();
        for outcome in outcomes {
            let target = if outcome.success { &mut ok } else { &mut failed };
            let _ = writeln!(target, "{}", outcome.log_line());
        }
        std::fs::write(success_path, ok).map_err(|e| CoreError::io(success_path, e))?;
        std::fs::write(failure_path, failed).map_err(|e| CoreError::io(failure_path, e))?;
        Ok(Self::tally(outcomes))
    }
}
