// ── Migration and provisioning inputs ──

use serde::{Deserialize, Serialize};

use super::entity::EntityKind;

/// One hardware unit from a legacy system's inventory export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyHardware {
    pub name: String,
    pub address: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Opaque `user:password` blob, encoded by the legacy system.
    #[serde(default)]
    pub encrypted_credentials: String,
    pub driver_id: i32,
    #[serde(default)]
    pub devices: Vec<LegacyDevice>,
}

fn default_http_port() -> u16 {
    80
}

impl LegacyHardware {
    /// Device URI handed to the add-hardware task.
    pub fn uri(&self) -> String {
        format!("http://{}:{}/", self.address, self.http_port)
    }

    /// Legacy device of `kind` on `channel`, if the inventory lists one.
    pub fn device(&self, kind: EntityKind, channel: i32) -> Option<&LegacyDevice> {
        self.devices
            .iter()
            .find(|d| d.kind == kind && d.channel == channel)
    }
}

/// A channel on a legacy hardware unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDevice {
    pub kind: EntityKind,
    pub channel: i32,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}

/// One row of a new-hardware provisioning batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewHardwareRecord {
    pub address: String,
    pub user_name: String,
    pub password: String,
    pub driver_number: i32,
    pub hardware_name: String,
    #[serde(default)]
    pub device_name_prefix: String,
    pub recorder_name: String,
    #[serde(default)]
    pub camera_group_name: String,
}

impl NewHardwareRecord {
    /// Example row written by `provision-template`.
    pub fn template() -> Self {
        Self {
            address: "http://192.168.1.100/".into(),
            user_name: "root".into(),
            password: "pass".into(),
            driver_number: 806,
            hardware_name: "Front Door".into(),
            device_name_prefix: "Front Door".into(),
            recorder_name: "Recorder 1".into(),
            camera_group_name: "Entrances".into(),
        }
    }

    /// Prefix for generated channel names, defaulting to the hardware name.
    pub fn name_prefix(&self) -> &str {
        if self.device_name_prefix.trim().is_empty() {
            &self.hardware_name
        } else {
            &self.device_name_prefix
        }
    }
}
