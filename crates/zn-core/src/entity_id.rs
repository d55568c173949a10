// ── Entity identifiers ──
//
// Every Zero Networks entity is addressed by `<kind>:<source>:<rest>`.
// The kind letter decides which endpoint family accepts the id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::CoreError;

/// Where a group's membership comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum GroupSource {
    Custom,
    #[strum(serialize = "ou")]
    OrganizationalUnit,
    Directory,
    Tag,
    System,
}

impl GroupSource {
    fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "c" => Some(Self::Custom),
            "o" => Some(Self::OrganizationalUnit),
            "a" => Some(Self::Directory),
            "t" => Some(Self::Tag),
            "s" => Some(Self::System),
            _ => None,
        }
    }
}

/// Entity kind parsed from an id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Asset,
    Group(GroupSource),
    Identity,
    Cluster,
    Unknown,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset => f.write_str("asset"),
            Self::Group(source) => write!(f, "{source} group"),
            Self::Identity => f.write_str("identity"),
            Self::Cluster => f.write_str("deployment cluster"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// A typed-prefix entity id such as `a:a:8f2e...` or `g:c:1234`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn kind(&self) -> EntityKind {
        let mut parts = self.0.splitn(3, ':');
        let (Some(kind), Some(source), Some(rest)) = (parts.next(), parts.next(), parts.next())
        else {
            return EntityKind::Unknown;
        };
        if rest.is_empty() {
            return EntityKind::Unknown;
        }
        match kind {
            "a" => EntityKind::Asset,
            "u" => EntityKind::Identity,
            "C" => EntityKind::Cluster,
            "g" => GroupSource::from_letter(source).map_or(EntityKind::Unknown, EntityKind::Group),
            _ => EntityKind::Unknown,
        }
    }

    /// API collection that accepts this id, relative to `/api/v1/`.
    pub fn endpoint_family(&self) -> Option<String> {
        match self.kind() {
            EntityKind::Asset => Some("assets".into()),
            EntityKind::Group(source) => Some(format!("groups/{source}")),
            EntityKind::Identity => Some("users".into()),
            EntityKind::Cluster => Some("environments/clusters".into()),
            EntityKind::Unknown => None,
        }
    }

    /// Parse and require a specific kind.
    pub fn parse_kind(raw: &str, expected: EntityKind) -> Result<Self, CoreError> {
        let id: Self = raw.parse()?;
        if id.kind() == expected {
            Ok(id)
        } else {
            Err(CoreError::validation(format!(
                "'{id}' is not a {expected} id (got {})",
                id.kind()
            )))
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CoreError::validation("entity id cannot be empty"));
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn asset_prefix() {
        let id = EntityId::from("a:a:ZgR3bDEx");
        assert_eq!(id.kind(), EntityKind::Asset);
        assert_eq!(id.endpoint_family().as_deref(), Some("assets"));
    }

    #[test]
    fn group_sources() {
        assert_eq!(
            EntityId::from("g:c:abc").kind(),
            EntityKind::Group(GroupSource::Custom)
        );
        assert_eq!(
            EntityId::from("g:o:abc").endpoint_family().as_deref(),
            Some("groups/ou")
        );
        assert_eq!(EntityId::from("g:z:abc").kind(), EntityKind::Unknown);
    }

    #[test]
    fn cluster_prefix_is_case_sensitive() {
        assert_eq!(EntityId::from("C:d:1").kind(), EntityKind::Cluster);
        assert_eq!(EntityId::from("c:d:1").kind(), EntityKind::Unknown);
    }

    #[test]
    fn malformed_ids_are_unknown() {
        assert_eq!(EntityId::from("a:a:").kind(), EntityKind::Unknown);
        assert_eq!(EntityId::from("plainhost").kind(), EntityKind::Unknown);
        assert!(EntityId::from("nope").endpoint_family().is_none());
    }

    #[test]
    fn from_str_trims_and_rejects_empty() {
        let id: EntityId = "  u:a:42 ".parse().unwrap();
        assert_eq!(id.as_str(), "u:a:42");
        assert_eq!(id.kind(), EntityKind::Identity);
        assert!("   ".parse::<EntityId>().is_err());
    }

    #[test]
    fn parse_kind_checks_prefix() {
        assert!(EntityId::parse_kind("a:a:1", EntityKind::Asset).is_ok());
        let err = EntityId::parse_kind("g:c:1", EntityKind::Asset).unwrap_err();
        assert!(err.to_string().contains("not a asset id"));
    }
}
