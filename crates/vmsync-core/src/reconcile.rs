// ── Reconciliation engine ──
//
// Applies a batch of desired-state records onto live entities. Records are
// matched to entities by id (case-insensitive) and processed concurrently.
// A field-level rejection only affects its own record. Any other failure
// is systemic: under the default policy it stops the batch, and the
// caller receives the partial report alongside the error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::model::{DesiredRecord, Entity, EntityId};
use crate::parallel;
use crate::poller::TaskPoller;
use crate::report::{InvalidItem, ItemFailure, ItemRef, ReconcileReport};
use crate::service::ConfigService;

/// What to do with the rest of a batch after a systemic failure.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop starting new records and return `BatchAborted`.
    #[default]
    Abort,
    /// Record the failure and keep going.
    Skip,
}

enum Outcome {
    Updated(ItemRef),
    Unmatched(EntityId),
    Invalid(InvalidItem),
    Failed(ItemFailure, CoreError),
    Abandoned(EntityId),
}

pub struct ReconciliationEngine {
    service: Arc<dyn ConfigService>,
    concurrency: usize,
    policy: FailurePolicy,
    task_poller: TaskPoller,
}

impl ReconciliationEngine {
    pub fn new(service: Arc<dyn ConfigService>, concurrency: usize) -> Self {
        Self {
            service,
            concurrency,
            policy: FailurePolicy::default(),
            task_poller: TaskPoller::short(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_task_poller(mut self, poller: TaskPoller) -> Self {
        self.task_poller = poller;
        self
    }

    /// Apply every record onto its live counterpart in `live`.
    ///
    /// Returns the report when the batch ran to completion, including
    /// under [`FailurePolicy::Skip`] with failures recorded in it.
    pub async fn reconcile<R: DesiredRecord>(
        &self,
        records: Vec<R>,
        live: Vec<Entity>,
    ) -> Result<ReconcileReport, CoreError> {
        info!(records = records.len(), live = live.len(), "reconciling batch");

        let live = Arc::new(live);
        let cancel = CancellationToken::new();
        let worker = Worker {
            service: Arc::clone(&self.service),
            live,
            cancel: cancel.clone(),
            policy: self.policy,
            task_poller: self.task_poller,
        };
        let worker = Arc::new(worker);

        let outcomes = parallel::map_collect(records, self.concurrency, move |record| {
            let worker = Arc::clone(&worker);
            async move { worker.apply(record).await }
        })
        .await;

        let mut report = ReconcileReport::default();
        let mut first_failure: Option<(EntityId, CoreError)> = None;
        for outcome in outcomes {
            match outcome {
                Outcome::Updated(item) => report.updated.push(item),
                Outcome::Unmatched(id) => report.unmatched.push(id),
                Outcome::Invalid(item) => report.invalid.push(item),
                Outcome::Failed(item, err) => {
                    if first_failure.is_none() {
                        first_failure = Some((item.id.clone(), err));
                    }
                    report.failed.push(item);
                }
                Outcome::Abandoned(id) => report.abandoned.push(id),
            }
        }

        info!(
            updated = report.updated.len(),
            unmatched = report.unmatched.len(),
            invalid = report.invalid.len(),
            failed = report.failed.len(),
            abandoned = report.abandoned.len(),
            "batch finished"
        );

        match (self.policy, first_failure) {
            (FailurePolicy::Abort, Some((id, source))) => Err(CoreError::BatchAborted {
                id,
                source: Box::new(source),
                report: Box::new(report),
            }),
            _ => Ok(report),
        }
    }
}

struct Worker {
    service: Arc<dyn ConfigService>,
    live: Arc<Vec<Entity>>,
    cancel: CancellationToken,
    policy: FailurePolicy,
    task_poller: TaskPoller,
}

impl Worker {
    async fn apply<R: DesiredRecord>(&self, record: R) -> Outcome {
        let id = record.id().clone();
        if self.cancel.is_cancelled() {
            return Outcome::Abandoned(id);
        }

        let mut matches = self.live.iter().filter(|e| e.id == id);
        let Some(found) = matches.next() else {
            info!(%id, "no live entity matches record");
            return Outcome::Unmatched(id);
        };
        let duplicates = matches.count();
        if duplicates > 0 {
            warn!(%id, duplicates, "several live entities share this id, using the first");
        }

        let mut entity = found.clone();
        debug!(%id, name = %entity.name, "updating");
        record.apply_to(&mut entity);

        if let Some(request) = record.pre_save_task(&entity) {
            self.run_pre_save_task(&entity, &request).await;
        }

        match self.service.save(&entity).await {
            Ok(()) => Outcome::Updated(ItemRef {
                id,
                name: entity.name,
            }),
            Err(CoreError::Validation { fields, .. }) => {
                let dump = record.dump();
                warn!(
                    %id,
                    name = %found.name,
                    "not updated due to one or more invalid fields:\n{dump}"
                );
                Outcome::Invalid(InvalidItem {
                    id,
                    name: found.name.clone(),
                    fields,
                    record: dump,
                })
            }
            Err(err) => {
                error!(%id, name = %found.name, error = %err, "update failed");
                if self.policy == FailurePolicy::Abort {
                    self.cancel.cancel();
                }
                let failure = ItemFailure {
                    id,
                    name: found.name.clone(),
                    message: err.to_string(),
                };
                Outcome::Failed(failure, err)
            }
        }
    }

    /// Runs a task the record needs before saving. Its failure is logged and
    /// does not stop the save.
    async fn run_pre_save_task(&self, entity: &Entity, request: &crate::model::TaskRequest) {
        let outcome = match self.service.submit_task(request).await {
            Ok(task) => {
                self.task_poller
                    .await_completion(self.service.as_ref(), task, &self.cancel)
                    .await
            }
            Err(e) => Err(e),
        };
        match outcome.and_then(|o| o.into_result(request.operation)) {
            Ok(_) => debug!(name = %entity.name, operation = %request.operation, "pre-save task done"),
            Err(e) => warn!(
                name = %entity.name,
                operation = %request.operation,
                error = %e,
                "pre-save task did not succeed"
            ),
        }
    }
}
