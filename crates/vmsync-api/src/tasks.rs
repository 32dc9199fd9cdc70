// Server task endpoints
//
// Long-running operations (adding hardware, changing passwords, creating
// groups) are submitted as tasks and polled by path until they settle.

use tracing::debug;

use crate::client::ConfigClient;
use crate::error::Error;
use crate::models::{Property, TaskItem, TaskSubmission};

impl ConfigClient {
    /// Start a task by invoking `method` on the item at `path`.
    ///
    /// `POST /api/tasks` with `{path, method, arguments}`
    pub async fn submit_task(
        &self,
        path: &str,
        method: &str,
        arguments: &[Property],
    ) -> Result<TaskItem, Error> {
        let url = self.api_url("tasks")?;
        let body = TaskSubmission {
            path,
            method,
            arguments,
        };
        let tasks: Vec<TaskItem> = self.post(url, &body).await?;
        let task = tasks.into_iter().next().ok_or_else(|| Error::EmptyResponse {
            endpoint: format!("tasks ({method})"),
        })?;
        debug!(method, task = %task.path, state = %task.state, "task submitted");
        Ok(task)
    }

    /// Fetch the latest snapshot of a task.
    ///
    /// `GET /api/tasks?path={task_path}`
    pub async fn poll_task(&self, task_path: &str) -> Result<TaskItem, Error> {
        let url = self.item_url("tasks", task_path)?;
        let tasks: Vec<TaskItem> = self.get(url).await?;
        tasks.into_iter().next().ok_or_else(|| Error::NotFound {
            path: task_path.to_owned(),
        })
    }
}
