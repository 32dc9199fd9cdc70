// ── Entity identity ──
//
// Entities on the management server are identified by GUIDs, but exported
// spreadsheets and hand-edited inventories carry them as free text with
// arbitrary casing. EntityId normalizes both sides so that matching is
// case-insensitive no matter which form an identifier arrives in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

/// Canonical identifier for any configuration entity.
///
/// Parses to a UUID whenever possible. Anything else is kept verbatim and
/// compared ASCII-case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityId {
    Uuid(Uuid),
    Other(String),
}

impl EntityId {
    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Self::Uuid(u) => Some(u),
            Self::Other(_) => None,
        }
    }
}

impl PartialEq for EntityId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Other(a), Self::Other(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

impl Eq for EntityId {}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Uuid(u) => {
                0u8.hash(state);
                u.hash(state);
            }
            Self::Other(s) => {
                1u8.hash(state);
                for b in s.bytes() {
                    b.to_ascii_lowercase().hash(state);
                }
            }
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl From<Uuid> for EntityId {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        match Uuid::parse_str(s.trim()) {
            Ok(u) => Self::Uuid(u),
            Err(_) => Self::Other(s),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uuid_match_ignores_case() {
        let lower = EntityId::from("550e8400-e29b-41d4-a716-446655440000");
        let upper = EntityId::from("550E8400-E29B-41D4-A716-446655440000");
        assert!(lower.as_uuid().is_some());
        assert_eq!(lower, upper);
    }

    #[test]
    fn free_text_match_ignores_case() {
        let a = EntityId::from("cam-lobby-01");
        let b = EntityId::from("CAM-Lobby-01");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn display_is_lowercase_hyphenated_for_uuids() {
        let id: EntityId = "550E8400-E29B-41D4-A716-446655440000".parse().unwrap();
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn serde_round_trips_through_plain_string() {
        let id = EntityId::from("550e8400-e29b-41d4-a716-446655440000");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
