// ── Entity catalog ──
//
// Enumerates live entities by walking the configuration tree: recording
// servers at the root, hardware under each server, channel devices under
// each hardware unit. Each level fans out across its parents concurrently;
// results are gathered on the calling task before being returned.

use std::sync::Arc;

use tracing::debug;

use crate::error::CoreError;
use crate::model::{DriverRecord, Entity, EntityKind, child_folder};
use crate::parallel;
use crate::service::ConfigService;

#[derive(Clone)]
pub struct EntityCatalog {
    service: Arc<dyn ConfigService>,
    concurrency: usize,
}

impl EntityCatalog {
    pub fn new(service: Arc<dyn ConfigService>, concurrency: usize) -> Self {
        Self {
            service,
            concurrency,
        }
    }

    pub fn service(&self) -> &Arc<dyn ConfigService> {
        &self.service
    }

    /// Children of `kind` directly under `parent_path` (`""` for the root).
    pub async fn fetch_children(
        &self,
        parent_path: &str,
        kind: EntityKind,
    ) -> Result<Vec<Entity>, CoreError> {
        fetch_children(self.service.as_ref(), parent_path, kind).await
    }

    /// Children of `kind` under every entity in `parents`, flattened.
    ///
    /// Any failing parent fails the whole enumeration.
    pub async fn fan_out(
        &self,
        parents: &[Entity],
        kind: EntityKind,
    ) -> Result<Vec<Entity>, CoreError> {
        let paths: Vec<String> = parents.iter().map(|p| p.path.clone()).collect();
        let service = Arc::clone(&self.service);
        let batches = parallel::map_collect(paths, self.concurrency, move |path| {
            let service = Arc::clone(&service);
            async move { fetch_children(service.as_ref(), &path, kind).await }
        })
        .await;

        let mut all = Vec::new();
        for batch in batches {
            all.extend(batch?);
        }
        all.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(%kind, parents = parents.len(), count = all.len(), "enumerated entities");
        Ok(all)
    }

    // ── Hierarchy shortcuts ──────────────────────────────────────────

    pub async fn recording_servers(&self) -> Result<Vec<Entity>, CoreError> {
        self.fetch_children("", EntityKind::RecordingServer).await
    }

    /// All hardware on every recording server.
    pub async fn hardware(&self) -> Result<Vec<Entity>, CoreError> {
        let recorders = self.recording_servers().await?;
        self.fan_out(&recorders, EntityKind::Hardware).await
    }

    /// All channel devices of `kind` across all hardware.
    pub async fn channels(&self, kind: EntityKind) -> Result<Vec<Entity>, CoreError> {
        let hardware = self.hardware().await?;
        self.fan_out(&hardware, kind).await
    }

    pub async fn camera_groups(&self) -> Result<Vec<Entity>, CoreError> {
        self.fetch_children("", EntityKind::CameraGroup).await
    }

    /// First recording server whose name matches exactly.
    pub async fn recording_server_by_name(&self, name: &str) -> Result<Option<Entity>, CoreError> {
        Ok(self
            .recording_servers()
            .await?
            .into_iter()
            .find(|r| r.name == name))
    }

    /// Driver with vendor number `number` on the given recording server.
    pub async fn driver_by_number(
        &self,
        recorder_path: &str,
        number: i32,
    ) -> Result<Option<DriverRecord>, CoreError> {
        Ok(self
            .fetch_children(recorder_path, EntityKind::HardwareDriver)
            .await?
            .iter()
            .map(DriverRecord::from)
            .find(|d| d.number == number))
    }
}

async fn fetch_children(
    service: &dyn ConfigService,
    parent_path: &str,
    kind: EntityKind,
) -> Result<Vec<Entity>, CoreError> {
    let folder = child_folder(parent_path, kind);
    let mut children = service.get_child_items(&folder).await?;
    children.retain(|e| e.kind == kind);
    Ok(children)
}
