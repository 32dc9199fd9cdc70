// ── Remote task polling ──
//
// Drives a submitted server task to a terminal state by re-reading it on a
// fixed interval. The loop is bounded by a ceiling on total wait time and
// by an outer cancellation token; either way it settles on `TimedOut`
// rather than waiting forever.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{RemoteTask, TaskOutcome, TaskState};
use crate::service::ConfigService;

/// Interval between task refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Ceiling for adding hardware, which includes device discovery.
pub const ADD_HARDWARE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Ceiling for quick tasks (password changes, group edits).
pub const SHORT_TASK_TIMEOUT: Duration = Duration::from_secs(2 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPoller {
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl TaskPoller {
    pub const fn new(poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            poll_interval,
            max_wait,
        }
    }

    pub const fn add_hardware() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, ADD_HARDWARE_TIMEOUT)
    }

    pub const fn short() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, SHORT_TASK_TIMEOUT)
    }

    /// Poll `task` until it succeeds, fails, or runs out of time.
    ///
    /// Only transport failures while polling are returned as `Err`; a task
    /// that ends in error or never finishes is reported through the outcome.
    pub async fn await_completion(
        &self,
        service: &dyn ConfigService,
        task: RemoteTask,
        cancel: &CancellationToken,
    ) -> Result<TaskOutcome, CoreError> {
        let started = Instant::now();
        let mut task = task;

        loop {
            match task.state {
                TaskState::Success => {
                    debug!(task = %task.path, "task succeeded");
                    return Ok(TaskOutcome::Success {
                        result_path: task.result_path,
                    });
                }
                TaskState::Error => {
                    let message = task.error_text.unwrap_or_default();
                    debug!(task = %task.path, %message, "task failed");
                    return Ok(TaskOutcome::Error { message });
                }
                TaskState::Pending | TaskState::InProgress => {}
            }

            if started.elapsed() >= self.max_wait {
                warn!(
                    task = %task.path,
                    state = %task.state,
                    waited = ?started.elapsed(),
                    "task did not finish before the deadline"
                );
                return Ok(TaskOutcome::TimedOut {
                    last_state: task.state,
                });
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    debug!(task = %task.path, "polling cancelled");
                    return Ok(TaskOutcome::TimedOut { last_state: task.state });
                }
                () = tokio::time::sleep(self.poll_interval) => {}
            }

            task = service.poll_task(&task).await?;
            debug!(task = %task.path, state = %task.state, progress = task.progress, "task polled");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::TaskRequest;
    use crate::service::fake::{FakeService, TaskPlan};

    async fn submit(fake: &FakeService, plan: TaskPlan) -> RemoteTask {
        fake.plan_task(plan);
        fake.submit_task(&TaskRequest::delete_hardware("/A/B[1]/HardwareFolder/Hardware[h]"))
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn success_after_several_polls() {
        let fake = FakeService::new();
        let task = submit(&fake, TaskPlan::succeed_after(3, Some("/X[1]"))).await;
        let poller = TaskPoller::new(Duration::from_millis(500), Duration::from_secs(10));

        let started = Instant::now();
        let outcome = poller
            .await_completion(&fake, task, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TaskOutcome::Success {
                result_path: Some("/X[1]".into())
            }
        );
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(1500), "{waited:?}");
        assert!(waited < Duration::from_millis(1600), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn error_text_is_reported_verbatim() {
        let fake = FakeService::new();
        let task = submit(&fake, TaskPlan::fail("Hardware already exists")).await;

        let outcome = TaskPoller::short()
            .await_completion(&fake, task, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TaskOutcome::Error {
                message: "Hardware already exists".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn never_finishing_task_times_out_near_deadline() {
        let fake = FakeService::new();
        let task = submit(&fake, TaskPlan::never_finish()).await;
        let poller = TaskPoller::new(Duration::from_millis(500), Duration::from_secs(2));

        let started = Instant::now();
        let outcome = poller
            .await_completion(&fake, task, &CancellationToken::new())
            .await
            .unwrap();
        let waited = started.elapsed();

        assert_eq!(
            outcome,
            TaskOutcome::TimedOut {
                last_state: TaskState::InProgress
            }
        );
        assert!(waited >= Duration::from_secs(2), "returned early: {waited:?}");
        assert!(
            waited <= Duration::from_millis(2500),
            "overshot deadline: {waited:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_reports_last_state() {
        let fake = FakeService::new();
        let task = submit(&fake, TaskPlan::never_finish()).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = TaskPoller::add_hardware()
            .await_completion(&fake, task, &cancel)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TaskOutcome::TimedOut {
                last_state: TaskState::Pending
            }
        );
    }
}
