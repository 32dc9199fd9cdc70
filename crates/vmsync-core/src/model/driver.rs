// ── Hardware drivers ──

use serde::Serialize;

use super::entity::Entity;
use super::entity_id::EntityId;

/// A device driver installed on a recording server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverRecord {
    pub id: EntityId,
    pub name: String,
    /// Vendor-assigned driver number; `-1` when the server omits it.
    pub number: i32,
    pub path: String,
}

impl From<&Entity> for DriverRecord {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            number: entity.int_property("Number").unwrap_or(-1),
            path: entity.path.clone(),
        }
    }
}
