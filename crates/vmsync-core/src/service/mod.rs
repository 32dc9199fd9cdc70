// ── Configuration service seam ──
//
// Everything the engine needs from a management server, expressed over
// domain types. `ApiService` is the production implementation over
// `vmsync_api::ConfigClient`; tests run against an in-memory fake.

mod api;
#[cfg(test)]
pub(crate) mod fake;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{Entity, RemoteTask, TaskRequest};

pub use api::ApiService;

/// Remote configuration operations.
#[async_trait]
pub trait ConfigService: Send + Sync {
    /// Direct children of a folder. Items of unknown type are skipped.
    async fn get_child_items(&self, folder_path: &str) -> Result<Vec<Entity>, CoreError>;

    async fn get_item(&self, path: &str) -> Result<Entity, CoreError>;

    /// Invoke a parameterless method on an item and return its result properties.
    async fn invoke_method(
        &self,
        path: &str,
        method: &str,
    ) -> Result<BTreeMap<String, String>, CoreError>;

    /// Persist an entity. Field rejections surface as [`CoreError::Validation`].
    async fn save(&self, entity: &Entity) -> Result<(), CoreError>;

    async fn submit_task(&self, request: &TaskRequest) -> Result<RemoteTask, CoreError>;

    /// Refresh a task's snapshot.
    async fn poll_task(&self, task: &RemoteTask) -> Result<RemoteTask, CoreError>;
}
