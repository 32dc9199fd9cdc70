// ── Server tasks ──
//
// Long-running server operations are submitted as tasks and observed by
// polling. This module holds the typed task state, the submission request,
// and the terminal outcome a poll loop settles on.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity::{EntityKind, child_folder};
use crate::error::CoreError;

/// Lifecycle state of a server task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum TaskState {
    Pending,
    InProgress,
    Success,
    Error,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// Snapshot of a server task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTask {
    pub path: String,
    pub state: TaskState,
    pub progress: u8,
    pub error_text: Option<String>,
    /// Path of the item the task created, once it has succeeded.
    pub result_path: Option<String>,
}

/// Where a poll loop settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success { result_path: Option<String> },
    Error { message: String },
    TimedOut { last_state: TaskState },
}

impl TaskOutcome {
    /// Convert a non-success outcome into an error attributed to `operation`.
    pub fn into_result(self, operation: TaskOperation) -> Result<Option<String>, CoreError> {
        match self {
            Self::Success { result_path } => Ok(result_path),
            Self::Error { message } => Err(CoreError::TaskFailed {
                operation: operation.to_string(),
                message,
            }),
            Self::TimedOut { last_state } => Err(CoreError::TaskTimedOut {
                operation: operation.to_string(),
                last_state,
            }),
        }
    }
}

// ── Requests ────────────────────────────────────────────────────────

/// Server methods that run as tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TaskOperation {
    AddHardware,
    #[strum(serialize = "ChangePasswordHardware")]
    ChangePassword,
    DeleteHardware,
    AddDeviceGroup,
    AddDeviceGroupMember,
}

/// A task to submit: the method to run and the item it runs on.
#[derive(Clone)]
pub struct TaskRequest {
    /// Path of the item the method is invoked on.
    pub target: String,
    pub operation: TaskOperation,
    pub arguments: Vec<(String, TaskArgument)>,
}

/// Argument value. Secrets stay wrapped until they reach the wire.
#[derive(Clone)]
pub enum TaskArgument {
    Plain(String),
    Secret(SecretString),
}

impl TaskArgument {
    pub fn expose(&self) -> &str {
        match self {
            Self::Plain(v) => v,
            Self::Secret(s) => s.expose_secret(),
        }
    }
}

impl fmt::Debug for TaskArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(v) => write!(f, "{v:?}"),
            Self::Secret(_) => f.write_str("[REDACTED]"),
        }
    }
}

impl fmt::Debug for TaskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRequest")
            .field("target", &self.target)
            .field("operation", &self.operation)
            .field("arguments", &self.arguments)
            .finish()
    }
}

impl TaskRequest {
    fn new(target: impl Into<String>, operation: TaskOperation) -> Self {
        Self {
            target: target.into(),
            operation,
            arguments: Vec::new(),
        }
    }

    fn arg(mut self, key: &str, value: impl Into<String>) -> Self {
        self.arguments
            .push((key.to_owned(), TaskArgument::Plain(value.into())));
        self
    }

    fn secret(mut self, key: &str, value: &SecretString) -> Self {
        self.arguments
            .push((key.to_owned(), TaskArgument::Secret(value.clone())));
        self
    }

    /// Look up an argument by key.
    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.expose())
    }

    /// Add a hardware unit to a recording server.
    pub fn add_hardware(
        recorder_path: &str,
        address: &str,
        driver_path: &str,
        username: &str,
        password: &SecretString,
    ) -> Self {
        Self::new(
            child_folder(recorder_path, EntityKind::Hardware),
            TaskOperation::AddHardware,
        )
        .arg("HardwareAddress", address)
        .arg("HardwareDriverPath", driver_path)
        .arg("UserName", username)
        .secret("Password", password)
    }

    /// Change the device password stored for a hardware unit.
    pub fn change_password(hardware_path: &str, password: &SecretString) -> Self {
        Self::new(hardware_path, TaskOperation::ChangePassword).secret("Password", password)
    }

    /// Remove a hardware unit. Runs on the owning recorder's hardware folder.
    pub fn delete_hardware(hardware_path: &str) -> Self {
        let recorder = super::entity::parent_path(hardware_path);
        Self::new(
            child_folder(recorder, EntityKind::Hardware),
            TaskOperation::DeleteHardware,
        )
        .arg("ItemSelection", hardware_path)
    }

    /// Create a top-level camera group.
    pub fn add_device_group(name: &str, description: &str) -> Self {
        Self::new(
            child_folder("", EntityKind::CameraGroup),
            TaskOperation::AddDeviceGroup,
        )
        .arg("GroupName", name)
        .arg("GroupDescription", description)
    }

    /// Add a camera to an existing camera group.
    pub fn add_device_group_member(group_path: &str, camera_path: &str) -> Self {
        Self::new(
            child_folder(group_path, EntityKind::Camera),
            TaskOperation::AddDeviceGroupMember,
        )
        .arg("ItemSelection", camera_path)
    }
}
