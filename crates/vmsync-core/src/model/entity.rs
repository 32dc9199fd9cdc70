// ── Configuration entities ──
//
// A loosely typed view over items in the management server's
// configuration tree. Every entity has an identity, a kind, a path, a
// name, and an enabled flag; everything else lives in a string property
// bag. Paths follow `/<Type>Folder/<Type>[<id>]/<Child>Folder/<Child>[<id>]`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity_id::EntityId;

/// Item types the engine understands.
///
/// The `Display`/`FromStr` forms are the server's item type tags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum EntityKind {
    RecordingServer,
    Hardware,
    HardwareDriver,
    HardwareDriverSettings,
    Camera,
    Microphone,
    Speaker,
    Metadata,
    #[strum(serialize = "InputEvent")]
    #[serde(rename = "InputEvent", alias = "Input")]
    Input,
    Output,
    DeviceDriverSettings,
    CameraGroup,
}

/// Channel-bearing child kinds of a hardware unit, in configuration order.
pub const CHANNEL_KINDS: [EntityKind; 6] = [
    EntityKind::Camera,
    EntityKind::Microphone,
    EntityKind::Speaker,
    EntityKind::Metadata,
    EntityKind::Input,
    EntityKind::Output,
];

impl EntityKind {
    /// Name of the folder that holds children of this kind.
    pub fn folder(self) -> String {
        format!("{self}Folder")
    }

    /// Human label used when generating channel names.
    pub fn label(self) -> &'static str {
        match self {
            Self::RecordingServer => "Recording Server",
            Self::Hardware => "Hardware",
            Self::HardwareDriver => "Driver",
            Self::HardwareDriverSettings | Self::DeviceDriverSettings => "Settings",
            Self::Camera => "Camera",
            Self::Microphone => "Microphone",
            Self::Speaker => "Speaker",
            Self::Metadata => "Metadata",
            Self::Input => "Input",
            Self::Output => "Output",
            Self::CameraGroup => "Camera Group",
        }
    }

    pub fn is_channel(self) -> bool {
        CHANNEL_KINDS.contains(&self)
    }

    /// Whether entities of this kind carry a `RecordingEnabled` property.
    pub fn records(self) -> bool {
        matches!(
            self,
            Self::Camera | Self::Microphone | Self::Speaker | Self::Metadata
        )
    }
}

// ── Entity ──────────────────────────────────────────────────────────

/// Snapshot of one configuration item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub path: String,
    pub name: String,
    pub enabled: bool,
    /// Kind-specific attributes, keyed by server property name.
    pub properties: BTreeMap<String, String>,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, kind: EntityKind, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            path: path.into(),
            name: String::new(),
            enabled: false,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    /// Property lookup, case-insensitive on the key.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Set a property, replacing any existing key that differs only in case.
    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        let existing = self
            .properties
            .keys()
            .find(|k| k.eq_ignore_ascii_case(key))
            .cloned();
        let key = existing.unwrap_or_else(|| key.to_owned());
        self.properties.insert(key, value.into());
    }

    pub fn bool_property(&self, key: &str) -> Option<bool> {
        self.property(key).and_then(parse_bool)
    }

    pub fn int_property(&self, key: &str) -> Option<i32> {
        self.property(key).and_then(|v| v.trim().parse().ok())
    }

    /// Channel index (zero-based) of a channel-bearing entity.
    pub fn channel(&self) -> Option<i32> {
        self.int_property("Channel")
    }

    /// Path of the owning entity (two segments up: `<Type>Folder/<Type>[id]`).
    pub fn parent_path(&self) -> &str {
        parent_path(&self.path)
    }

    /// Path of the folder holding this entity's children of `kind`.
    pub fn child_folder(&self, kind: EntityKind) -> String {
        child_folder(&self.path, kind)
    }
}

// ── Path helpers ────────────────────────────────────────────────────

/// Strip the last `Folder/Item[id]` pair from a path.
///
/// Returns `""` for top-level items.
pub fn parent_path(path: &str) -> &str {
    let mut cut = path.trim_end_matches('/');
    for _ in 0..2 {
        match cut.rfind('/') {
            Some(idx) => cut = &cut[..idx],
            None => return "",
        }
    }
    cut
}

/// Folder holding children of `kind` under `parent`. `""` is the root.
pub fn child_folder(parent: &str, kind: EntityKind) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), kind.folder())
}

/// Identifier embedded in the last path segment, e.g. `abc` in `.../Camera[abc]`.
pub fn id_from_path(path: &str) -> Option<&str> {
    let last = path.rsplit('/').next()?;
    let open = last.find('[')?;
    let inner = last[open + 1..].strip_suffix(']')?;
    (!inner.is_empty()).then_some(inner)
}

/// Server booleans arrive as `True`/`False` or `true`/`false`.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        v if v.eq_ignore_ascii_case("true") => Some(true),
        v if v.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

pub(crate) fn format_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CAMERA: &str =
        "/RecordingServerFolder/RecordingServer[r1]/HardwareFolder/Hardware[h1]/CameraFolder/Camera[c1]";

    #[test]
    fn parent_path_strips_folder_and_item() {
        assert_eq!(
            parent_path(CAMERA),
            "/RecordingServerFolder/RecordingServer[r1]/HardwareFolder/Hardware[h1]"
        );
        assert_eq!(
            parent_path("/RecordingServerFolder/RecordingServer[r1]/HardwareFolder/Hardware[h1]"),
            "/RecordingServerFolder/RecordingServer[r1]"
        );
        assert_eq!(parent_path("/RecordingServerFolder/RecordingServer[r1]"), "");
    }

    #[test]
    fn child_folder_from_root_and_entity() {
        assert_eq!(
            child_folder("", EntityKind::RecordingServer),
            "/RecordingServerFolder"
        );
        assert_eq!(
            child_folder("/RecordingServerFolder/RecordingServer[r1]", EntityKind::Input),
            "/RecordingServerFolder/RecordingServer[r1]/InputEventFolder"
        );
    }

    #[test]
    fn id_is_read_from_last_segment() {
        assert_eq!(id_from_path(CAMERA), Some("c1"));
        assert_eq!(id_from_path("/CameraGroupFolder"), None);
        assert_eq!(id_from_path("/Camera[]"), None);
    }

    #[test]
    fn kind_tags_round_trip() {
        assert_eq!(EntityKind::Input.to_string(), "InputEvent");
        assert_eq!("InputEvent".parse::<EntityKind>().unwrap(), EntityKind::Input);
        assert_eq!("Camera".parse::<EntityKind>().unwrap(), EntityKind::Camera);
        assert!("Unicorn".parse::<EntityKind>().is_err());
    }

    #[test]
    fn property_keys_are_case_insensitive() {
        let mut e = Entity::new("c1", EntityKind::Camera, CAMERA).with_property("Channel", "2");
        assert_eq!(e.channel(), Some(2));
        e.set_property("CHANNEL", "3");
        assert_eq!(e.properties.len(), 1);
        assert_eq!(e.channel(), Some(3));
    }

    #[test]
    fn booleans_accept_server_casing() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }
}
