// ── Bulk hardware maintenance ──
//
// Fleet-wide operations that each run as one server task per hardware
// unit: rotating the stored device password and deleting units. A unit's
// failure is reported and never stops the others.

use std::sync::Arc;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::EngineSettings;
use crate::error::CoreError;
use crate::model::{Entity, EntityId, TaskOperation, TaskRequest};
use crate::parallel;
use crate::poller::TaskPoller;
use crate::report::{ItemFailure, ItemRef, MaintenanceReport};
use crate::service::ConfigService;

#[derive(Clone)]
pub struct Maintenance {
    service: Arc<dyn ConfigService>,
    poller: TaskPoller,
    concurrency: usize,
    cancel: CancellationToken,
}

impl Maintenance {
    pub fn new(service: Arc<dyn ConfigService>, settings: &EngineSettings) -> Self {
        Self {
            service,
            poller: settings.short_task_poller(),
            concurrency: settings.concurrency,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set `password` on every unit in `hardware`, concurrently.
    pub async fn change_passwords(
        &self,
        hardware: Vec<Entity>,
        password: SecretString,
    ) -> MaintenanceReport {
        info!(units = hardware.len(), "changing hardware passwords");
        let this = self.clone();
        let outcomes = parallel::map_collect(hardware, self.concurrency, move |unit| {
            let this = this.clone();
            let password = password.clone();
            async move {
                let request = TaskRequest::change_password(&unit.path, &password);
                let result = this.run(&request, TaskOperation::ChangePassword).await;
                (unit, result)
            }
        })
        .await;

        let mut report = collect(outcomes, "password not changed");
        sort(&mut report);
        report
    }

    /// Delete every unit in `live` whose id is listed in `ids`, one at a time.
    ///
    /// Ids with no live unit are logged and skipped.
    pub async fn delete_hardware(&self, ids: &[EntityId], live: &[Entity]) -> MaintenanceReport {
        let mut outcomes = Vec::new();
        for id in ids {
            let Some(unit) = live.iter().find(|e| &e.id == id) else {
                warn!(%id, "no hardware with this id, nothing to delete");
                continue;
            };
            info!(name = %unit.name, %id, "deleting hardware");
            let request = TaskRequest::delete_hardware(&unit.path);
            let result = self.run(&request, TaskOperation::DeleteHardware).await;
            outcomes.push((unit.clone(), result));
        }
        collect(outcomes, "hardware not deleted")
    }

    async fn run(&self, request: &TaskRequest, operation: TaskOperation) -> Result<(), CoreError> {
        let task = self.service.submit_task(request).await?;
        self.poller
            .await_completion(self.service.as_ref(), task, &self.cancel)
            .await?
            .into_result(operation)
            .map(|_| ())
    }
}

fn collect(outcomes: Vec<(Entity, Result<(), CoreError>)>, failure: &str) -> MaintenanceReport {
    let mut report = MaintenanceReport::default();
    for (unit, result) in outcomes {
        match result {
            Ok(()) => report.succeeded.push(ItemRef {
                id: unit.id,
                name: unit.name,
            }),
            Err(e) => {
                warn!(name = %unit.name, id = %unit.id, error = %e, "{failure}");
                report.failed.push(ItemFailure {
                    id: unit.id,
                    name: unit.name,
                    message: e.to_string(),
                });
            }
        }
    }
    report
}

fn sort(report: &mut MaintenanceReport) {
    report.succeeded.sort_by(|a, b| a.name.cmp(&b.name));
    report.failed.sort_by(|a, b| a.name.cmp(&b.name));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::EntityKind;
    use crate::service::fake::{FakeService, TaskPlan, channel, hardware, recorder};

    fn fleet(fake: &FakeService) -> Vec<Entity> {
        let rec = recorder("r1", "R");
        let units: Vec<Entity> = ["a", "b", "c"]
            .iter()
            .map(|id| hardware(&rec, id, &format!("Unit {id}")))
            .collect();
        for unit in &units {
            fake.insert(channel(unit, EntityKind::Camera, &format!("{}-c0", unit.id), 0));
            fake.insert(unit.clone());
        }
        units
    }

    #[tokio::test(start_paused = true)]
    async fn password_change_reports_each_unit() {
        let fake = Arc::new(FakeService::new());
        let units = fleet(&fake);
        fake.plan_task(TaskPlan::succeed_after(1, None));
        fake.plan_task(TaskPlan::fail("device refused new password"));
        fake.plan_task(TaskPlan::succeed_after(2, None));

        let report = Maintenance::new(
            Arc::clone(&fake) as Arc<dyn ConfigService>,
            &EngineSettings::default(),
        )
        .change_passwords(units, SecretString::from("N3w-pass".to_owned()))
        .await;

        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].message.contains("device refused new password"));
        let submitted = fake.submitted();
        assert_eq!(submitted.len(), 3);
        assert!(submitted.iter().all(|r| r.argument("Password") == Some("N3w-pass")));
    }

    #[tokio::test(start_paused = true)]
    async fn password_tasks_time_out_independently() {
        let fake = Arc::new(FakeService::new());
        let units = fleet(&fake);
        fake.plan_task(TaskPlan::never_finish());

        let report = Maintenance::new(
            Arc::clone(&fake) as Arc<dyn ConfigService>,
            &EngineSettings::default(),
        )
        .change_passwords(units, SecretString::from("x".to_owned()))
        .await;

        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].message.contains("did not finish in time"));
    }

    #[tokio::test]
    async fn deletes_listed_units_only() {
        let fake = Arc::new(FakeService::new());
        let units = fleet(&fake);
        let ids = vec![EntityId::from("B"), EntityId::from("missing")];

        let report = Maintenance::new(
            Arc::clone(&fake) as Arc<dyn ConfigService>,
            &EngineSettings::default(),
        )
        .delete_hardware(&ids, &units)
        .await;

        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.succeeded[0].name, "Unit b");
        assert!(fake.item(&units[1].path).is_none());
        assert!(fake.item(&format!("{}/CameraFolder/Camera[b-c0]", units[1].path)).is_none());
        assert!(fake.item(&units[0].path).is_some());
    }
}
