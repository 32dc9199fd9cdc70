// ── Migration orchestrator ──
//
// Moves hardware units described by a legacy inventory onto one recording
// server. Units run one after another; each is a strict sequence of
// steps, and a unit that fails any hard step is recorded and skipped so
// the rest of the inventory still migrates. Legacy devices are matched to
// new channels by channel number, since the two systems share no ids.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::channel::{Channel, ChannelDevice, ChannelSettings, channel_name};
use crate::config::EngineSettings;
use crate::credentials::CredentialResolver;
use crate::error::CoreError;
use crate::model::{Entity, EntityKind, LegacyHardware};
use crate::report::{BatchReport, CompletedUnit, UnitFailure};
use crate::saga::HardwareSaga;
use crate::service::ConfigService;

/// Where migrated units land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Display name of the target recording server.
    pub recorder_name: String,
    /// Camera group to file migrated cameras into, if any.
    pub camera_group: Option<String>,
}

pub struct MigrationOrchestrator {
    saga: HardwareSaga,
    credentials: CredentialResolver,
    options: MigrationOptions,
    recorder: OnceCell<Entity>,
}

impl MigrationOrchestrator {
    pub fn new(
        service: Arc<dyn ConfigService>,
        credentials: CredentialResolver,
        options: MigrationOptions,
        settings: &EngineSettings,
    ) -> Self {
        Self {
            saga: HardwareSaga::new(service, settings),
            credentials,
            options,
            recorder: OnceCell::new(),
        }
    }

    /// Stop waiting on server tasks once `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.saga = self.saga.with_cancellation(cancel);
        self
    }

    /// Migrate every unit in order and report which ones made it.
    pub async fn migrate(&self, units: Vec<LegacyHardware>) -> BatchReport {
        info!(
            units = units.len(),
            recorder = %self.options.recorder_name,
            "starting migration"
        );
        let mut report = BatchReport::start();

        for unit in units {
            match self.migrate_unit(&unit).await {
                Ok(done) => {
                    info!(name = %unit.name, path = %done.hardware_path, "hardware migrated");
                    report.completed.push(done);
                }
                Err(e) => {
                    warn!(name = %unit.name, address = %unit.address, error = %e, "hardware not migrated");
                    report.failed.push(UnitFailure {
                        name: unit.name.clone(),
                        address: unit.uri(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let report = report.finish();
        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            "migration finished"
        );
        report
    }

    /// Target recording server, resolved once per orchestrator.
    async fn recorder(&self) -> Result<&Entity, CoreError> {
        self.recorder
            .get_or_try_init(|| self.saga.recorder(&self.options.recorder_name))
            .await
    }

    async fn migrate_unit(&self, unit: &LegacyHardware) -> Result<CompletedUnit, CoreError> {
        let recorder = self.recorder().await?;
        let driver = self.saga.driver(recorder, unit.driver_id).await?;
        let credential = self.credentials.decrypt(&unit.encrypted_credentials).await;

        let hardware_path = self
            .saga
            .add_hardware(recorder, &unit.uri(), &driver, &credential)
            .await?;
        let hardware = self.saga.finish_hardware(&hardware_path, &unit.name).await?;

        let configured = self
            .saga
            .configure_channels(&hardware, |device: &ChannelDevice| legacy_settings(unit, device))
            .await;
        if configured.summary.failed > 0 {
            warn!(
                name = %unit.name,
                failed = configured.summary.failed,
                "some devices kept their default settings"
            );
        }

        if let Some(group) = &self.options.camera_group {
            self.saga.join_group(group, &configured.cameras).await;
        }

        Ok(CompletedUnit {
            name: unit.name.clone(),
            hardware_path,
        })
    }
}

/// Settings for a new channel, copied from the matching legacy device.
fn legacy_settings(unit: &LegacyHardware, device: &impl Channel) -> ChannelSettings {
    let (kind, channel) = (device.kind(), device.channel());
    if let Some(legacy) = unit.device(kind, channel) {
        return ChannelSettings {
            name: legacy.name.clone(),
            enabled: legacy.enabled,
        };
    }
    let name = if kind == EntityKind::Camera {
        format!("{} {}", kind.label(), channel + 1)
    } else {
        channel_name(&unit.name, kind, channel)
    };
    ChannelSettings {
        name,
        enabled: false,
    }
}
