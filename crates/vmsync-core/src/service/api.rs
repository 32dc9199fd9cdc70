use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;
use vmsync_api::{ConfigClient, ConfigItem, Property};

use super::ConfigService;
use crate::convert::result_properties;
use crate::error::CoreError;
use crate::model::{Entity, RemoteTask, TaskRequest};

/// [`ConfigService`] backed by the HTTP configuration API.
#[derive(Clone)]
pub struct ApiService {
    client: Arc<ConfigClient>,
}

impl ApiService {
    pub fn new(client: Arc<ConfigClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConfigService for ApiService {
    async fn get_child_items(&self, folder_path: &str) -> Result<Vec<Entity>, CoreError> {
        let items = self.client.get_child_items(folder_path).await?;
        let mut entities = Vec::with_capacity(items.len());
        for item in items {
            let (path, item_type) = (item.path.clone(), item.item_type.clone());
            match Entity::try_from(item) {
                Ok(entity) => entities.push(entity),
                Err(_) => trace!(%path, %item_type, "skipping item of unsupported type"),
            }
        }
        Ok(entities)
    }

    async fn get_item(&self, path: &str) -> Result<Entity, CoreError> {
        Entity::try_from(self.client.get_item(path).await?)
    }

    async fn invoke_method(
        &self,
        path: &str,
        method: &str,
    ) -> Result<BTreeMap<String, String>, CoreError> {
        let item = self.client.invoke_method(path, method).await?;
        Ok(result_properties(item))
    }

    async fn save(&self, entity: &Entity) -> Result<(), CoreError> {
        self.client
            .save_item(&ConfigItem::from(entity))
            .await
            .map_err(|e| match CoreError::from(e) {
                CoreError::Validation { fields, .. } => CoreError::Validation {
                    item: entity.name.clone(),
                    fields,
                },
                other => other,
            })
    }

    async fn submit_task(&self, request: &TaskRequest) -> Result<RemoteTask, CoreError> {
        let arguments: Vec<Property> = request
            .arguments
            .iter()
            .map(|(key, value)| Property::new(key.clone(), value.expose()))
            .collect();
        let task = self
            .client
            .submit_task(&request.target, &request.operation.to_string(), &arguments)
            .await?;
        RemoteTask::try_from(task)
    }

    async fn poll_task(&self, task: &RemoteTask) -> Result<RemoteTask, CoreError> {
        RemoteTask::try_from(self.client.poll_task(&task.path).await?)
    }
}
