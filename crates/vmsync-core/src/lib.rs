// vmsync-core: Reconciliation and task orchestration between vmsync-api and the CLI.

pub mod catalog;
pub mod channel;
pub mod config;
pub mod convert;
pub mod credentials;
pub mod driver_cache;
pub mod error;
pub mod export;
pub mod maintenance;
pub mod migrate;
pub mod model;
pub mod parallel;
pub mod poller;
pub mod provision;
pub mod reconcile;
pub mod report;
mod saga;
pub mod service;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use catalog::EntityCatalog;
pub use channel::{Channel, ChannelDevice, EnableStrategy};
pub use config::{AuthCredentials, ConnectionConfig, EngineSettings, TlsVerification};
pub use credentials::{
    BasicCredential, CommandDecoder, CredentialDecoder, CredentialResolver, HexDecoder,
};
pub use driver_cache::DriverCache;
pub use error::CoreError;
pub use export::Exporter;
pub use maintenance::Maintenance;
pub use migrate::{MigrationOptions, MigrationOrchestrator};
pub use poller::TaskPoller;
pub use provision::Provisioner;
pub use reconcile::{FailurePolicy, ReconciliationEngine};
pub use report::{BatchReport, MaintenanceReport, ReconcileReport};
pub use saga::GROUP_DESCRIPTION;
pub use service::{ApiService, ConfigService};
pub use session::{ConnectionState, Session};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    CameraRecord, DesiredRecord, DeviceRecord, Entity, EntityId, EntityKind, HardwareRecord,
    LegacyHardware, NewHardwareRecord, RecorderRecord, TaskOutcome, TaskState,
};
