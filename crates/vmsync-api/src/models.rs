// Wire types for the configuration API.
//
// Every response is wrapped in `{ meta: { rc, msg, validation }, data: [] }`.
// Items are loosely typed: an item type tag plus a flat list of string
// key/value properties, mirroring how the management server models its
// configuration tree.

use serde::{Deserialize, Serialize};

use crate::error::FieldError;

/// Response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub meta: Meta,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Meta {
    pub rc: String,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub validation: Vec<FieldError>,
}

/// A key/value pair on a configuration item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

impl Property {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A node in the management server's configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigItem {
    pub path: String,
    pub item_type: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl ConfigItem {
    /// Look up a property value by key (case-insensitive).
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(key))
            .map(|p| p.value.as_str())
    }

    /// Set a property, replacing an existing value with the same key.
    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .properties
            .iter_mut()
            .find(|p| p.key.eq_ignore_ascii_case(key))
        {
            Some(existing) => existing.value = value,
            None => self.properties.push(Property::new(key, value)),
        }
    }
}

/// Snapshot of a long-running server task.
///
/// `state` is one of `Pending`, `InProgress`, `Success`, `Error`; `core`
/// maps it to a typed enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub path: String,
    pub state: String,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub error_text: Option<String>,
    #[serde(default)]
    pub result_path: Option<String>,
}

/// Request body for method invocation.
#[derive(Debug, Serialize)]
pub(crate) struct InvokeRequest<'a> {
    pub path: &'a str,
    pub method: &'a str,
}

/// Request body for task submission.
#[derive(Debug, Serialize)]
pub(crate) struct TaskSubmission<'a> {
    pub path: &'a str,
    pub method: &'a str,
    pub arguments: &'a [Property],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_lookup_ignores_case() {
        let mut item = ConfigItem {
            path: "/RecordingServerFolder/RecordingServer[a]".into(),
            item_type: "RecordingServer".into(),
            display_name: "rec-01".into(),
            properties: vec![Property::new("HostName", "rec-01.local")],
        };
        assert_eq!(item.property("hostname"), Some("rec-01.local"));

        item.set_property("HOSTNAME", "rec-02.local");
        item.set_property("PortNumber", "7563");
        assert_eq!(item.properties.len(), 2);
        assert_eq!(item.property("HostName"), Some("rec-02.local"));
    }
}
