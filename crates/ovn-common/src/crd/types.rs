//! Types shared by the OVN agent CRDs

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// AgentKind
// =============================================================================

/// The per-node agents managed by the operator.
///
/// Selects which workload builder, mode commands and mount set apply.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum AgentKind {
    /// `ovn-controller`, the southbound database consumer
    Controller,
    /// `ovsdb-server`, the local Open vSwitch database
    DbServer,
    /// `ovs-vswitchd`, the switching dataplane
    Vswitchd,
}

impl AgentKind {
    /// All agent kinds, in deployment order
    pub const ALL: [AgentKind; 3] = [Self::DbServer, Self::Vswitchd, Self::Controller];

    /// Service name; also the `service=` pod label and the DaemonSet name
    pub fn service_name(self) -> &'static str {
        match self {
            Self::Controller => "ovn-controller",
            Self::DbServer => "ovsdb-server",
            Self::Vswitchd => "ovs-vswitchd",
        }
    }

    /// Name of the single agent container in the pod
    pub fn container_name(self) -> &'static str {
        self.service_name()
    }

    /// Prefix of the RBAC objects (service account, role, binding)
    pub fn rbac_prefix(self) -> &'static str {
        match self {
            Self::Controller => "ovncontroller-",
            Self::DbServer => "ovsdbserver-",
            Self::Vswitchd => "ovsvswitchd-",
        }
    }

    /// Custom resource kind that declares this agent
    pub fn resource_kind(self) -> &'static str {
        match self {
            Self::Controller => "OVNController",
            Self::DbServer => "OVSDBServer",
            Self::Vswitchd => "OVSvswitchd",
        }
    }

    /// Environment variable overriding the default image of this kind
    pub fn image_env_key(self) -> &'static str {
        match self {
            Self::Controller => crate::defaults::OVN_CONTROLLER_IMAGE_ENV,
            Self::DbServer => crate::defaults::OVSDB_SERVER_IMAGE_ENV,
            Self::Vswitchd => crate::defaults::OVS_VSWITCHD_IMAGE_ENV,
        }
    }

    /// Whether the agent exposes a liveness probe in production mode
    pub fn has_liveness_probe(self) -> bool {
        !matches!(self, Self::Controller)
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.service_name())
    }
}

// =============================================================================
// Debug
// =============================================================================

/// Debug switches for an agent
///
/// With `service` enabled the agent container idles (`sleep infinity`) so an
/// operator can exec into it without the daemon running.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DebugSpec {
    /// Start the container idle instead of running the agent
    #[serde(default)]
    pub service: bool,
}

// =============================================================================
// Resources
// =============================================================================

/// CPU and memory quantity
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ResourceQuantity {
    /// CPU quantity (e.g. "500m")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    /// Memory quantity (e.g. "512Mi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

/// Compute resource bounds for the agent container
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ResourceRequirements {
    /// Minimum guaranteed resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceQuantity>,
    /// Hard limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceQuantity>,
}

// =============================================================================
// Status
// =============================================================================

/// Observed state shared by the three agent resources
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    /// Number of agent pods that are ready
    #[serde(default)]
    pub number_ready: i32,

    /// Number of nodes that should be running the agent
    #[serde(default)]
    pub desired_number_scheduled: i32,

    /// Content hashes of applied objects (e.g. per-node configuration tasks)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hash: BTreeMap<String, String>,

    /// Network attachments requested for the agent pods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_attachments: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_names_are_distinct() {
        let mut names: Vec<_> = AgentKind::ALL.iter().map(|k| k.service_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn only_daemon_kinds_have_probes() {
        assert!(!AgentKind::Controller.has_liveness_probe());
        assert!(AgentKind::DbServer.has_liveness_probe());
        assert!(AgentKind::Vswitchd.has_liveness_probe());
    }

    #[test]
    fn display_uses_service_name() {
        assert_eq!(AgentKind::Vswitchd.to_string(), "ovs-vswitchd");
        assert_eq!(AgentKind::DbServer.rbac_prefix(), "ovsdbserver-");
    }

    #[test]
    fn empty_status_omits_maps() {
        let json = serde_json::to_value(AgentStatus::default()).unwrap();
        assert!(json.get("hash").is_none());
        assert_eq!(json["numberReady"], 0);
    }
}
