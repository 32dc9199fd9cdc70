// ── Domain model ──
//
// Loosely typed configuration entities plus the typed records the engine
// reads from and writes to spreadsheets and inventories.

pub mod driver;
pub mod entity;
pub mod entity_id;
pub mod migration;
pub mod records;
pub mod task;

// ── Re-exports ──────────────────────────────────────────────────────

pub use driver::DriverRecord;
pub use entity::{CHANNEL_KINDS, Entity, EntityKind, child_folder, id_from_path, parent_path};
pub use entity_id::EntityId;
pub use migration::{LegacyDevice, LegacyHardware, NewHardwareRecord};
pub use records::{CameraRecord, DesiredRecord, DeviceRecord, HardwareRecord, RecorderRecord};
pub use task::{RemoteTask, TaskArgument, TaskOperation, TaskOutcome, TaskRequest, TaskState};
