//! Response and request types for the Zero Networks `/api/v1/` endpoints.
//!
//! Field names use camelCase via `#[serde(rename_all = "camelCase")]`.
//! Integer enumerations decode into typed enums with an `Other` fallback so
//! values added server-side never break decoding.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

// ── Integer enums ────────────────────────────────────────────────────

macro_rules! int_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident = $value:literal => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            /// A value this client does not know about.
            Other(i64),
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                match value {
                    $($value => Self::$variant,)+
                    other => Self::Other(other),
                }
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => $value,)+
                    $name::Other(other) => other,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($label),)+
                    Self::Other(other) => write!(f, "Unknown({other})"),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_i64(i64::from(*self))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                i64::deserialize(deserializer).map(Self::from)
            }
        }
    };
}

int_enum! {
    /// Segmentation state of an asset.
    pub enum ProtectionState {
        Unprotected = 1 => "Unprotected",
        Learning = 2 => "Learning",
        Protected = 3 => "Protected",
    }
}

int_enum! {
    /// Health as reported by the monitoring source.
    pub enum HealthState {
        Healthy = 1 => "Healthy",
        Unhealthy = 2 => "Unhealthy",
        Inactive = 3 => "Inactive",
    }
}

int_enum! {
    /// What monitors the asset.
    pub enum MonitoringMethod {
        SegmentServer = 1 => "Segment Server",
        Agent = 2 => "Agent",
        CloudConnector = 3 => "Cloud Connector",
        Manual = 4 => "Manual",
    }
}

int_enum! {
    /// How an asset came to be in its deployment cluster.
    pub enum ClusterAssignmentSource {
        NotApplicable = 0 => "Not applicable",
        Automatic = 1 => "Automatic",
        Manual = 2 => "Manual",
    }
}

impl MonitoringMethod {
    /// Parse a CLI-friendly name (`segment-server`, `agent`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "segment-server" | "segmentserver" | "ss" => Some(Self::SegmentServer),
            "agent" => Some(Self::Agent),
            "cloud-connector" | "cloudconnector" => Some(Self::CloudConnector),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

// ── Assets ───────────────────────────────────────────────────────────

/// A monitored endpoint: from `GET /assets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fqdn: Option<String>,
    #[serde(default)]
    pub asset_type: Option<i64>,
    #[serde(default)]
    pub protection_state: Option<ProtectionState>,
    #[serde(default)]
    pub health_state: Option<HealthState>,
    #[serde(default)]
    pub asset_status: Option<i64>,
    #[serde(default, rename = "sourceType", alias = "monitoredBy")]
    pub monitored_by: Option<MonitoringMethod>,
    #[serde(default)]
    pub deployments_cluster_id: Option<String>,
    #[serde(default, rename = "deploymentsClusterSource")]
    pub cluster_source: Option<ClusterAssignmentSource>,
    /// Catch-all for additional fields not modeled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Asset {
    /// FQDN when known, else the display name.
    pub fn host(&self) -> &str {
        self.fqdn
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

/// Single-entity envelope: `{"entity": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityEnvelope<T> {
    pub entity: T,
}

// ── Groups ───────────────────────────────────────────────────────────

/// Custom group overview: from `GET /groups/custom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub members_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomGroupCreate<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub members_ids: &'a [String],
}

/// Response to a create: the new id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEntity {
    #[serde(alias = "entityId")]
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersChange<'a> {
    pub members_ids: &'a [String],
}

// ── Environments ─────────────────────────────────────────────────────

/// A deployment cluster: from `GET /environments/clusters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentCluster {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub segment_server_ids: Vec<String>,
}

/// A segment server: from `GET /environments/segment-servers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentServer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default, alias = "deploymentsClusterId")]
    pub cluster_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAssignment<'a> {
    pub deployments_cluster_id: &'a str,
}

// ── Activities ───────────────────────────────────────────────────────

/// One side of a network activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Stable id of the underlying event; string or number on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_record_id: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A network activity: from `GET /activities/network`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkActivity {
    /// Epoch milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub src: ActivityEndpoint,
    #[serde(default)]
    pub dst: ActivityEndpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_type: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NetworkActivity {
    /// Dedupe key: the source event record id as text.
    pub fn event_record_id(&self) -> Option<String> {
        match self.src.event_record_id.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::String(_) | Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn asset_decodes_typed_enums() {
        let asset: Asset = serde_json::from_value(json!({
            "id": "a:a:abc",
            "name": "SRV-01",
            "fqdn": "srv-01.corp.local",
            "protectionState": 3,
            "healthState": 1,
            "sourceType": 2,
            "deploymentsClusterId": "C:d:1",
            "deploymentsClusterSource": 2,
            "ipV4Addresses": ["10.0.0.5"]
        }))
        .unwrap();
        assert_eq!(asset.protection_state, Some(ProtectionState::Protected));
        assert_eq!(asset.health_state, Some(HealthState::Healthy));
        assert_eq!(asset.monitored_by, Some(MonitoringMethod::Agent));
        assert_eq!(asset.cluster_source, Some(ClusterAssignmentSource::Manual));
        assert!(asset.extra.contains_key("ipV4Addresses"));
        assert_eq!(asset.host(), "srv-01.corp.local");
    }

    #[test]
    fn unknown_enum_values_are_kept() {
        let state: HealthState = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(state, HealthState::Other(42));
        assert_eq!(state.to_string(), "Unknown(42)");
        assert_eq!(serde_json::to_value(state).unwrap(), json!(42));
    }

    #[test]
    fn monitoring_method_names() {
        assert_eq!(
            MonitoringMethod::from_name("Segment_Server"),
            Some(MonitoringMethod::SegmentServer)
        );
        assert_eq!(MonitoringMethod::from_name("ss"), Some(MonitoringMethod::SegmentServer));
        assert_eq!(MonitoringMethod::from_name("carrier pigeon"), None);
    }

    #[test]
    fn event_record_id_accepts_numbers() {
        let a: NetworkActivity =
            serde_json::from_value(json!({"src": {"eventRecordId": 991}})).unwrap();
        assert_eq!(a.event_record_id().as_deref(), Some("991"));
        let b: NetworkActivity = serde_json::from_value(json!({"src": {}})).unwrap();
        assert_eq!(b.event_record_id(), None);
    }
}
