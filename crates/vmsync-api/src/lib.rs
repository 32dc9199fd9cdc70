// vmsync-api: Async Rust client for a VMS management server's configuration API
//
// The management server exposes its configuration as a tree of items
// addressed by path (`/RecordingServerFolder/RecordingServer[id]/...`).
// This crate speaks the wire protocol only: session login, item reads and
// writes, method invocation, and long-running server tasks. Domain logic
// lives in `vmsync-core`.

pub mod auth;
pub mod client;
pub mod error;
pub mod items;
pub mod models;
pub mod tasks;
pub mod transport;

pub use client::ConfigClient;
pub use error::{Error, FieldError};
pub use models::{ConfigItem, Property, TaskItem};
pub use transport::{TlsMode, TransportConfig};
