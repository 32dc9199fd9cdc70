// ── Desired-state records ──
//
// One record per row of an exported spreadsheet. Columns prefixed with
// `ReadOnly` are echoed for reference and ignored on import; the rest are
// applied onto the live entity that shares the record's id.

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

use super::entity::{Entity, format_bool, parse_bool};
use super::entity_id::EntityId;
use super::task::TaskRequest;

/// A row that can be reconciled against a live entity.
pub trait DesiredRecord: Serialize + Send + Sync + 'static {
    /// Identity of the live entity this record targets.
    fn id(&self) -> &EntityId;

    /// Copy the record's mutable fields onto `entity`.
    fn apply_to(&self, entity: &mut Entity);

    /// A task that must run before the entity is saved, if any.
    fn pre_save_task(&self, _entity: &Entity) -> Option<TaskRequest> {
        None
    }

    /// Pretty JSON rendering for diagnostics.
    fn dump(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("<unprintable: {e}>"))
    }
}

/// CSV writers emit `true`/`false`; spreadsheets round-tripped through
/// other tools often come back as `True`/`FALSE`.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_bool(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid boolean {raw:?}")))
}

// ── Recording servers ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecorderRecord {
    pub name: String,
    #[serde(default)]
    pub read_only_host_name: String,
    #[serde(default)]
    pub read_only_port: i32,
    #[serde(default)]
    pub read_only_version: String,
    #[serde(default)]
    pub read_only_device_pack: String,
    #[serde(default)]
    pub read_only_time_zone_name: String,
    #[serde(default)]
    pub read_only_management_server: String,
    pub read_only_id: EntityId,
}

impl DesiredRecord for RecorderRecord {
    fn id(&self) -> &EntityId {
        &self.read_only_id
    }

    fn apply_to(&self, entity: &mut Entity) {
        entity.name.clone_from(&self.name);
    }
}

// ── Hardware ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HardwareRecord {
    pub name: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub enabled: bool,
    pub address: String,
    pub user_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub read_only_mac: String,
    #[serde(default)]
    pub read_only_driver_name: String,
    #[serde(default)]
    pub read_only_driver_number: i32,
    #[serde(default)]
    pub read_only_recording_server: String,
    pub read_only_id: EntityId,
}

impl DesiredRecord for HardwareRecord {
    fn id(&self) -> &EntityId {
        &self.read_only_id
    }

    fn apply_to(&self, entity: &mut Entity) {
        entity.name.clone_from(&self.name);
        entity.enabled = self.enabled;
        entity.set_property("Address", self.address.clone());
        entity.set_property("UserName", self.user_name.clone());
    }

    fn pre_save_task(&self, entity: &Entity) -> Option<TaskRequest> {
        if self.password.is_empty() {
            return None;
        }
        let password = SecretString::from(self.password.clone());
        Some(TaskRequest::change_password(&entity.path, &password))
    }

    fn dump(&self) -> String {
        let mut masked = self.clone();
        if !masked.password.is_empty() {
            masked.password = "********".into();
        }
        serde_json::to_string_pretty(&masked).unwrap_or_else(|e| format!("<unprintable: {e}>"))
    }
}

// ── Cameras ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CameraRecord {
    pub name: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub enabled: bool,
    #[serde(default)]
    pub read_only_resolution: String,
    #[serde(default)]
    pub read_only_channel: i32,
    #[serde(default)]
    pub read_only_hardware_name: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub recording_enabled: bool,
    #[serde(default)]
    pub read_only_driver_name: String,
    #[serde(default)]
    pub read_only_driver_number: i32,
    #[serde(default)]
    pub read_only_recording_server: String,
    pub read_only_id: EntityId,
}

impl DesiredRecord for CameraRecord {
    fn id(&self) -> &EntityId {
        &self.read_only_id
    }

    fn apply_to(&self, entity: &mut Entity) {
        entity.name.clone_from(&self.name);
        entity.enabled = self.enabled;
        entity.set_property("RecordingEnabled", format_bool(self.recording_enabled));
    }
}

// ── Other channel devices ───────────────────────────────────────────

/// Microphones, speakers, metadata, inputs, and outputs share one shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceRecord {
    pub name: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub enabled: bool,
    #[serde(default)]
    pub read_only_channel: i32,
    #[serde(default)]
    pub read_only_hardware_name: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub recording_enabled: bool,
    #[serde(default)]
    pub read_only_driver_name: String,
    #[serde(default)]
    pub read_only_driver_number: i32,
    #[serde(default)]
    pub read_only_recording_server: String,
    pub read_only_id: EntityId,
}

impl DesiredRecord for DeviceRecord {
    fn id(&self) -> &EntityId {
        &self.read_only_id
    }

    fn apply_to(&self, entity: &mut Entity) {
        entity.name.clone_from(&self.name);
        entity.enabled = self.enabled;
        // Inputs and outputs have no recording setting to update.
        if entity.kind.records() {
            entity.set_property("RecordingEnabled", format_bool(self.recording_enabled));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::entity::EntityKind;

    fn hardware_record(password: &str) -> HardwareRecord {
        HardwareRecord {
            name: "Lobby encoder".into(),
            enabled: true,
            address: "http://10.0.0.5/".into(),
            user_name: "admin".into(),
            password: password.into(),
            read_only_mac: String::new(),
            read_only_driver_name: String::new(),
            read_only_driver_number: 0,
            read_only_recording_server: String::new(),
            read_only_id: EntityId::from("h1"),
        }
    }

    #[test]
    fn hardware_apply_sets_address_and_user() {
        let mut entity = Entity::new("h1", EntityKind::Hardware, "/Hardware[h1]")
            .with_property("address", "http://old/");
        hardware_record("").apply_to(&mut entity);
        assert_eq!(entity.name, "Lobby encoder");
        assert!(entity.enabled);
        assert_eq!(entity.property("Address"), Some("http://10.0.0.5/"));
        assert_eq!(entity.property("UserName"), Some("admin"));
    }

    #[test]
    fn hardware_password_change_only_when_present() {
        let entity = Entity::new("h1", EntityKind::Hardware, "/Hardware[h1]");
        assert!(hardware_record("").pre_save_task(&entity).is_none());
        let task = hardware_record("n3w").pre_save_task(&entity).unwrap();
        assert_eq!(task.argument("Password"), Some("n3w"));
    }

    #[test]
    fn hardware_dump_masks_password() {
        let dump = hardware_record("n3w").dump();
        assert!(!dump.contains("n3w"));
        assert!(dump.contains("\"Password\": \"********\""));
    }

    #[test]
    fn device_record_skips_recording_flag_for_outputs() {
        let record = DeviceRecord {
            name: "Siren".into(),
            enabled: true,
            read_only_channel: 0,
            read_only_hardware_name: String::new(),
            recording_enabled: true,
            read_only_driver_name: String::new(),
            read_only_driver_number: 0,
            read_only_recording_server: String::new(),
            read_only_id: EntityId::from("o1"),
        };
        let mut output = Entity::new("o1", EntityKind::Output, "/Output[o1]");
        record.apply_to(&mut output);
        assert_eq!(output.property("RecordingEnabled"), None);

        let mut mic = Entity::new("m1", EntityKind::Microphone, "/Microphone[m1]");
        record.apply_to(&mut mic);
        assert_eq!(mic.property("RecordingEnabled"), Some("True"));
    }

    #[test]
    fn lenient_bool_accepts_capitalized_values() {
        let json = r#"{"Name":"Cam","Enabled":"True","RecordingEnabled":"FALSE","ReadOnlyId":"c1"}"#;
        let record: CameraRecord = serde_json::from_str(json).unwrap();
        assert!(record.enabled);
        assert!(!record.recording_enabled);
    }
}
