// ── Run reports ──
//
// Structured summaries returned by every batch operation. The CLI renders
// them as tables or serializes them as JSON/YAML.

use chrono::{DateTime, Utc};
use serde::Serialize;
use vmsync_api::FieldError;

use crate::model::EntityId;

/// An entity a batch touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRef {
    pub id: EntityId,
    pub name: String,
}

/// A record the server rejected field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidItem {
    pub id: EntityId,
    pub name: String,
    pub fields: Vec<FieldError>,
    /// Pretty-printed record as it was submitted.
    pub record: String,
}

/// An entity whose update failed for a reason other than validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub id: EntityId,
    pub name: String,
    pub message: String,
}

// ── Reconciliation ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub updated: Vec<ItemRef>,
    /// Records whose id matched no live entity.
    pub unmatched: Vec<EntityId>,
    pub invalid: Vec<InvalidItem>,
    pub failed: Vec<ItemFailure>,
    /// Records never attempted because the batch was aborted.
    pub abandoned: Vec<EntityId>,
}

impl ReconcileReport {
    /// True when every record was either applied or had nothing to match.
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty() && self.failed.is_empty() && self.abandoned.is_empty()
    }

    pub fn total(&self) -> usize {
        self.updated.len()
            + self.unmatched.len()
            + self.invalid.len()
            + self.failed.len()
            + self.abandoned.len()
    }
}

// ── Migration / provisioning ────────────────────────────────────────

/// A hardware unit that made it onto the target system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedUnit {
    pub name: String,
    pub hardware_path: String,
}

/// A hardware unit that could not be added, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    pub name: String,
    pub address: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub completed: Vec<CompletedUnit>,
    pub failed: Vec<UnitFailure>,
}

impl BatchReport {
    pub(crate) fn start() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            completed: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    /// One ` - {name} at {address}` line per failed unit.
    pub fn failure_lines(&self) -> Vec<String> {
        self.failed
            .iter()
            .map(|f| format!(" - {} at {}", f.name, f.address))
            .collect()
    }
}

// ── Maintenance ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub succeeded: Vec<ItemRef>,
    pub failed: Vec<ItemFailure>,
}
