// ── Hardware onboarding steps ──
//
// Migration and provisioning both bring a hardware unit onto a recording
// server the same way: resolve the driver, run the add-hardware task,
// rename the new unit, configure its channels, and file its cameras into a
// camera group. Nothing here compensates for a partial failure; a unit that
// fails halfway stays half-configured on the server.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::EntityCatalog;
use crate::channel::{
    Channel, ChannelDevice, ChannelSettings, ChannelSummary, channel_devices, configure_channels,
};
use crate::config::EngineSettings;
use crate::credentials::BasicCredential;
use crate::error::CoreError;
use crate::model::{CHANNEL_KINDS, DriverRecord, Entity, EntityKind, TaskOperation, TaskRequest};
use crate::poller::TaskPoller;
use crate::service::ConfigService;

/// Description given to camera groups created during onboarding.
pub const GROUP_DESCRIPTION: &str = "group added by vmsync";

/// Channels configured on a freshly added unit.
#[derive(Debug, Default)]
pub(crate) struct ConfiguredChannels {
    pub summary: ChannelSummary,
    /// Paths of the unit's cameras, in channel order.
    pub cameras: Vec<String>,
}

#[derive(Clone)]
pub(crate) struct HardwareSaga {
    service: Arc<dyn ConfigService>,
    catalog: EntityCatalog,
    add_poller: TaskPoller,
    short_poller: TaskPoller,
    cancel: CancellationToken,
}

impl HardwareSaga {
    pub(crate) fn new(service: Arc<dyn ConfigService>, settings: &EngineSettings) -> Self {
        Self {
            catalog: EntityCatalog::new(Arc::clone(&service), settings.concurrency),
            service,
            add_poller: settings.add_hardware_poller(),
            short_poller: settings.short_task_poller(),
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub(crate) async fn recorder(&self, name: &str) -> Result<Entity, CoreError> {
        self.catalog
            .recording_server_by_name(name)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                kind: "Recording server".into(),
                identifier: name.to_owned(),
            })
    }

    pub(crate) async fn driver(
        &self,
        recorder: &Entity,
        number: i32,
    ) -> Result<DriverRecord, CoreError> {
        self.catalog
            .driver_by_number(&recorder.path, number)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                kind: "Hardware driver".into(),
                identifier: format!("{number} on {}", recorder.name),
            })
    }

    /// Run the add-hardware task and return the new unit's path.
    pub(crate) async fn add_hardware(
        &self,
        recorder: &Entity,
        address: &str,
        driver: &DriverRecord,
        credential: &BasicCredential,
    ) -> Result<String, CoreError> {
        let request = TaskRequest::add_hardware(
            &recorder.path,
            address,
            &driver.path,
            &credential.username,
            &credential.password,
        );
        debug!(
            %address,
            driver = %driver.name,
            user = %credential.username,
            has_password = !credential.password.expose_secret().is_empty(),
            "adding hardware"
        );
        let task = self.service.submit_task(&request).await?;
        let outcome = self
            .add_poller
            .await_completion(self.service.as_ref(), task, &self.cancel)
            .await?;
        outcome
            .into_result(TaskOperation::AddHardware)?
            .ok_or_else(|| {
                CoreError::Internal(format!("adding {address} succeeded without a hardware path"))
            })
    }

    /// Name and enable a newly added unit. A failed save is only logged.
    pub(crate) async fn finish_hardware(
        &self,
        hardware_path: &str,
        name: &str,
    ) -> Result<Entity, CoreError> {
        let mut hardware = self.service.get_item(hardware_path).await?;
        hardware.name = name.to_owned();
        hardware.enabled = true;
        if let Err(e) = self.service.save(&hardware).await {
            warn!(path = %hardware_path, %name, error = %e, "could not rename hardware");
        }
        Ok(hardware)
    }

    /// Configure every channel-bearing collection of `hardware` with `plan`.
    pub(crate) async fn configure_channels<P>(
        &self,
        hardware: &Entity,
        plan: P,
    ) -> ConfiguredChannels
    where
        P: Fn(&ChannelDevice) -> ChannelSettings + Send + Sync,
    {
        let mut configured = ConfiguredChannels::default();
        for kind in CHANNEL_KINDS {
            let entities = match self.catalog.fetch_children(&hardware.path, kind).await {
                Ok(entities) => entities,
                Err(e) => {
                    warn!(hardware = %hardware.name, %kind, error = %e, "could not list devices");
                    continue;
                }
            };
            let devices = channel_devices(entities);
            if kind == EntityKind::Camera {
                let mut cameras: Vec<(i32, String)> = devices
                    .iter()
                    .map(|d| (d.channel(), d.entity().path.clone()))
                    .collect();
                cameras.sort();
                configured
                    .cameras
                    .extend(cameras.into_iter().map(|(_, path)| path));
            }
            let summary = configure_channels(self.service.as_ref(), devices, &plan).await;
            configured.summary.saved += summary.saved;
            configured.summary.failed += summary.failed;
        }
        configured
    }

    /// Path of the camera group called `name`, creating it if needed.
    pub(crate) async fn find_or_add_group(&self, name: &str) -> Result<String, CoreError> {
        if let Some(group) = self
            .catalog
            .camera_groups()
            .await?
            .into_iter()
            .find(|g| g.name == name)
        {
            return Ok(group.path);
        }

        info!(group = %name, "creating camera group");
        let task = self
            .service
            .submit_task(&TaskRequest::add_device_group(name, GROUP_DESCRIPTION))
            .await?;
        self.short_poller
            .await_completion(self.service.as_ref(), task, &self.cancel)
            .await?
            .into_result(TaskOperation::AddDeviceGroup)?
            .ok_or_else(|| {
                CoreError::Internal(format!("creating group {name} returned no group path"))
            })
    }

    /// Add each camera to the group. Returns how many were added.
    pub(crate) async fn assign_to_group(&self, group_path: &str, cameras: &[String]) -> usize {
        let mut added = 0;
        for camera in cameras {
            match self.add_group_member(group_path, camera).await {
                Ok(()) => added += 1,
                Err(e) => warn!(group = %group_path, %camera, error = %e, "could not add camera to group"),
            }
        }
        added
    }

    async fn add_group_member(&self, group_path: &str, camera: &str) -> Result<(), CoreError> {
        let task = self
            .service
            .submit_task(&TaskRequest::add_device_group_member(group_path, camera))
            .await?;
        self.short_poller
            .await_completion(self.service.as_ref(), task, &self.cancel)
            .await?
            .into_result(TaskOperation::AddDeviceGroupMember)
            .map(|_| ())
    }

    /// Find or create `group` and file `cameras` into it. Failures are logged.
    pub(crate) async fn join_group(&self, group: &str, cameras: &[String]) {
        if cameras.is_empty() {
            return;
        }
        match self.find_or_add_group(group).await {
            Ok(path) => {
                let added = self.assign_to_group(&path, cameras).await;
                debug!(%group, added, "cameras grouped");
            }
            Err(e) => warn!(%group, error = %e, "camera group unavailable, cameras left ungrouped"),
        }
    }
}
