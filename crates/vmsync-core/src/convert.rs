// ── API-to-domain type conversions ──
//
// Bridges raw `vmsync_api` wire types into canonical domain types. The
// identity, name, and enabled flag are lifted out of the property list;
// everything else stays in the entity's property bag.

use std::collections::BTreeMap;

use vmsync_api::{ConfigItem, Property, TaskItem};

use crate::error::CoreError;
use crate::model::entity::{format_bool, parse_bool};
use crate::model::{Entity, EntityId, EntityKind, RemoteTask, TaskState, id_from_path};

const ID: &str = "Id";
const NAME: &str = "Name";
const ENABLED: &str = "Enabled";

fn is_lifted(key: &str) -> bool {
    [ID, NAME, ENABLED].iter().any(|k| k.eq_ignore_ascii_case(key))
}

impl TryFrom<ConfigItem> for Entity {
    type Error = CoreError;

    fn try_from(item: ConfigItem) -> Result<Self, Self::Error> {
        let kind: EntityKind = item.item_type.parse().map_err(|_| {
            CoreError::Internal(format!("unsupported item type {:?}", item.item_type))
        })?;

        let id = item
            .property(ID)
            .or_else(|| id_from_path(&item.path))
            .map(EntityId::from)
            .ok_or_else(|| CoreError::Internal(format!("item {} has no id", item.path)))?;

        let name = item
            .property(NAME)
            .map_or_else(|| item.display_name.clone(), str::to_owned);
        let enabled = item.property(ENABLED).and_then(parse_bool).unwrap_or(false);

        let properties = item
            .properties
            .into_iter()
            .filter(|p| !is_lifted(&p.key))
            .map(|p| (p.key, p.value))
            .collect();

        Ok(Entity {
            id,
            kind,
            path: item.path,
            name,
            enabled,
            properties,
        })
    }
}

impl From<&Entity> for ConfigItem {
    fn from(entity: &Entity) -> Self {
        let mut properties = vec![
            Property::new(NAME, entity.name.clone()),
            Property::new(ENABLED, format_bool(entity.enabled)),
        ];
        properties.extend(
            entity
                .properties
                .iter()
                .map(|(k, v)| Property::new(k.clone(), v.clone())),
        );
        ConfigItem {
            path: entity.path.clone(),
            item_type: entity.kind.to_string(),
            display_name: entity.name.clone(),
            properties,
        }
    }
}

/// Flatten a method result into a property map.
pub(crate) fn result_properties(item: ConfigItem) -> BTreeMap<String, String> {
    item.properties
        .into_iter()
        .map(|p| (p.key, p.value))
        .collect()
}

impl TryFrom<TaskItem> for RemoteTask {
    type Error = CoreError;

    fn try_from(task: TaskItem) -> Result<Self, Self::Error> {
        let state: TaskState = task.state.parse().map_err(|_| {
            CoreError::Internal(format!("task {} reported unknown state {:?}", task.path, task.state))
        })?;
        Ok(RemoteTask {
            path: task.path,
            state,
            progress: task.progress,
            error_text: task.error_text,
            result_path: task.result_path,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn identity_name_and_flag_are_lifted() {
        let item = ConfigItem {
            path: "/RecordingServerFolder/RecordingServer[r1]/HardwareFolder/Hardware[h1]/CameraFolder/Camera[C1]".into(),
            item_type: "Camera".into(),
            display_name: "Lobby (display)".into(),
            properties: vec![
                Property::new("Name", "Lobby"),
                Property::new("Enabled", "True"),
                Property::new("Channel", "0"),
                Property::new("RecordingEnabled", "False"),
            ],
        };
        let entity = Entity::try_from(item).unwrap();
        assert_eq!(entity.kind, EntityKind::Camera);
        assert_eq!(entity.id, EntityId::from("c1"));
        assert_eq!(entity.name, "Lobby");
        assert!(entity.enabled);
        assert_eq!(entity.properties.len(), 2);
        assert_eq!(entity.channel(), Some(0));

        let back = ConfigItem::from(&entity);
        assert_eq!(back.property("Enabled"), Some("True"));
        assert_eq!(back.property("RecordingEnabled"), Some("False"));
    }

    #[test]
    fn unknown_item_types_are_rejected() {
        let item = ConfigItem {
            path: "/LicenseFolder/License[1]".into(),
            item_type: "License".into(),
            display_name: String::new(),
            properties: Vec::new(),
        };
        assert!(Entity::try_from(item).is_err());
    }

    #[test]
    fn task_state_is_typed() {
        let task = RemoteTask::try_from(TaskItem {
            path: "/Task[1]".into(),
            state: "InProgress".into(),
            progress: 50,
            error_text: None,
            result_path: None,
        })
        .unwrap();
        assert_eq!(task.state, TaskState::InProgress);

        let bad = RemoteTask::try_from(TaskItem {
            path: "/Task[1]".into(),
            state: "Exploded".into(),
            progress: 0,
            error_text: None,
            result_path: None,
        });
        assert!(bad.is_err());
    }
}
