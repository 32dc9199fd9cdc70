// ── New-hardware provisioning ──
//
// Adds a batch of brand-new hardware units described by spreadsheet rows.
// Rows are independent and run concurrently; each follows the same
// onboarding steps as a migration but names channels from a prefix and
// enables them by a per-kind strategy instead of copying legacy settings.

use std::collections::HashMap;
use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::channel::{Channel, ChannelDevice, ChannelSettings, EnableStrategy, channel_name};
use crate::config::EngineSettings;
use crate::credentials::BasicCredential;
use crate::error::CoreError;
use crate::model::{EntityKind, NewHardwareRecord};
use crate::parallel;
use crate::report::{BatchReport, CompletedUnit, UnitFailure};
use crate::saga::HardwareSaga;
use crate::service::ConfigService;

/// Initial enable state for a channel of `kind`.
pub fn default_strategy(kind: EntityKind) -> EnableStrategy {
    if kind == EntityKind::Camera {
        EnableStrategy::EnableFirstChannelOnly
    } else {
        EnableStrategy::EnableNone
    }
}

pub struct Provisioner {
    saga: HardwareSaga,
    concurrency: usize,
    /// Group name to path, so concurrent rows never create the same group twice.
    groups: Mutex<HashMap<String, String>>,
}

impl Provisioner {
    pub fn new(service: Arc<dyn ConfigService>, settings: &EngineSettings) -> Self {
        Self {
            saga: HardwareSaga::new(service, settings),
            concurrency: settings.concurrency,
            groups: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.saga = self.saga.with_cancellation(cancel);
        self
    }

    /// Add every row's hardware and report which units made it.
    pub async fn provision(self: Arc<Self>, rows: Vec<NewHardwareRecord>) -> BatchReport {
        info!(rows = rows.len(), "provisioning hardware");
        let mut report = BatchReport::start();

        let this = Arc::clone(&self);
        let outcomes = parallel::map_collect(rows, self.concurrency, move |row| {
            let this = Arc::clone(&this);
            async move {
                let result = this.provision_unit(&row).await;
                (row, result)
            }
        })
        .await;

        for (row, result) in outcomes {
            match result {
                Ok(done) => report.completed.push(done),
                Err(e) => {
                    warn!(name = %row.hardware_name, address = %row.address, error = %e, "hardware not added");
                    report.failed.push(UnitFailure {
                        name: row.hardware_name,
                        address: row.address,
                        reason: e.to_string(),
                    });
                }
            }
        }
        report.completed.sort_by(|a, b| a.name.cmp(&b.name));

        let report = report.finish();
        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            "provisioning finished"
        );
        report
    }

    async fn provision_unit(&self, row: &NewHardwareRecord) -> Result<CompletedUnit, CoreError> {
        let recorder = self.saga.recorder(&row.recorder_name).await?;
        let driver = self.saga.driver(&recorder, row.driver_number).await?;
        let credential = BasicCredential {
            username: row.user_name.clone(),
            password: SecretString::from(row.password.clone()),
        };

        let hardware_path = self
            .saga
            .add_hardware(&recorder, &row.address, &driver, &credential)
            .await?;
        let hardware = self
            .saga
            .finish_hardware(&hardware_path, &row.hardware_name)
            .await?;

        let prefix = row.name_prefix();
        let configured = self
            .saga
            .configure_channels(&hardware, |device: &ChannelDevice| ChannelSettings {
                name: channel_name(prefix, device.kind(), device.channel()),
                enabled: default_strategy(device.kind()).enabled_for(device.channel()),
            })
            .await;
        if configured.summary.failed > 0 {
            warn!(
                name = %row.hardware_name,
                failed = configured.summary.failed,
                "some devices kept their default settings"
            );
        }

        let group = row.camera_group_name.trim();
        if !group.is_empty() && !configured.cameras.is_empty() {
            match self.group_path(group).await {
                Ok(path) => {
                    self.saga.assign_to_group(&path, &configured.cameras).await;
                }
                Err(e) => warn!(%group, error = %e, "camera group unavailable, cameras left ungrouped"),
            }
        }

        info!(name = %row.hardware_name, path = %hardware_path, "hardware added");
        Ok(CompletedUnit {
            name: row.hardware_name.clone(),
            hardware_path,
        })
    }

    async fn group_path(&self, name: &str) -> Result<String, CoreError> {
        let mut groups = self.groups.lock().await;
        if let Some(path) = groups.get(name) {
            return Ok(path.clone());
        }
        let path = self.saga.find_or_add_group(name).await?;
        groups.insert(name.to_owned(), path.clone());
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::TaskOperation;
    use crate::service::fake::{FakeService, TaskPlan, channel, driver, hardware, recorder};

    fn row(name: &str, group: &str) -> NewHardwareRecord {
        NewHardwareRecord {
            hardware_name: name.into(),
            device_name_prefix: String::new(),
            camera_group_name: group.into(),
            ..NewHardwareRecord::template()
        }
    }

    fn server(units: &[&str]) -> Arc<FakeService> {
        let fake = FakeService::new();
        let rec = recorder("r1", "Recorder 1");
        fake.insert(driver(&rec, "d1", "Axis", 806));
        for id in units {
            let hw = hardware(&rec, id, "fresh");
            for c in 0..2 {
                fake.insert(channel(&hw, EntityKind::Camera, &format!("{id}-c{c}"), c));
            }
            fake.insert(channel(&hw, EntityKind::Speaker, &format!("{id}-s0"), 0));
            fake.insert(hw);
        }
        fake.insert(rec);
        Arc::new(fake)
    }

    fn hw_path(id: &str) -> String {
        format!("/RecordingServerFolder/RecordingServer[r1]/HardwareFolder/Hardware[{id}]")
    }

    #[test]
    fn cameras_enable_first_channel_only() {
        assert!(default_strategy(EntityKind::Camera).enabled_for(0));
        assert!(!default_strategy(EntityKind::Camera).enabled_for(1));
        assert!(!default_strategy(EntityKind::Speaker).enabled_for(0));
    }

    #[tokio::test(start_paused = true)]
    async fn provisions_with_generated_names() {
        let fake = server(&["h1"]);
        fake.plan_task(TaskPlan::succeed_after(1, Some(&hw_path("h1"))));
        let provisioner = Arc::new(Provisioner::new(
            Arc::clone(&fake) as Arc<dyn ConfigService>,
            &EngineSettings::default(),
        ));

        let report = provisioner.provision(vec![row("Front Door", "")]).await;
        assert!(report.failed.is_empty(), "{:?}", report.failed);

        let add = &fake.submitted()[0];
        assert_eq!(add.argument("HardwareAddress"), Some("http://192.168.1.100/"));
        assert_eq!(add.argument("UserName"), Some("root"));

        let cam0 = fake
            .item(&format!("{}/CameraFolder/Camera[h1-c0]", hw_path("h1")))
            .unwrap();
        let cam1 = fake
            .item(&format!("{}/CameraFolder/Camera[h1-c1]", hw_path("h1")))
            .unwrap();
        let speaker = fake
            .item(&format!("{}/SpeakerFolder/Speaker[h1-s0]", hw_path("h1")))
            .unwrap();
        assert_eq!((cam0.name.as_str(), cam0.enabled), ("Front Door - Camera 1", true));
        assert_eq!((cam1.name.as_str(), cam1.enabled), ("Front Door - Camera 2", false));
        assert_eq!((speaker.name.as_str(), speaker.enabled), ("Front Door - Speaker 1", false));
        assert!(
            fake.submitted()
                .iter()
                .all(|r| r.operation == TaskOperation::AddHardware)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shared_group_is_created_once() {
        let fake = server(&["h1", "h2"]);
        fake.plan_task(TaskPlan::succeed_after(1, Some(&hw_path("h1"))));
        fake.plan_task(TaskPlan::succeed_after(1, Some(&hw_path("h2"))));
        let provisioner = Arc::new(Provisioner::new(
            Arc::clone(&fake) as Arc<dyn ConfigService>,
            &EngineSettings {
                concurrency: 1,
                ..EngineSettings::default()
            },
        ));

        let report = provisioner
            .provision(vec![row("A", "Lobby"), row("B", "Lobby")])
            .await;
        assert_eq!(report.completed.len(), 2);

        let groups = fake
            .submitted()
            .iter()
            .filter(|r| r.operation == TaskOperation::AddDeviceGroup)
            .count();
        assert_eq!(groups, 1);
        assert_eq!(fake.group_members().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_recorder_fails_the_row() {
        let fake = server(&[]);
        let provisioner = Arc::new(Provisioner::new(
            Arc::clone(&fake) as Arc<dyn ConfigService>,
            &EngineSettings::default(),
        ));
        let mut bad = row("Nowhere", "");
        bad.recorder_name = "Recorder 9".into();

        let report = provisioner.provision(vec![bad]).await;
        assert_eq!(report.failed.len(), 1);
        assert_eq!(
            report.failed[0].reason,
            "Recording server not found: Recorder 9"
        );
    }
}
