//! OVSDBServer CRD types

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{AgentStatus, DebugSpec, ResourceRequirements};

/// Fall-back image for the ovsdb-server agent
pub const OVSDB_SERVER_OVS_CONTAINER_IMAGE: &str =
    "quay.io/podified-antelope-centos9/openstack-ovn-base:current-podified";

/// Desired state of the node-local Open vSwitch database servers
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ovn.openstack.org",
    version = "v1beta1",
    kind = "OVSDBServer",
    plural = "ovsdbservers",
    namespaced,
    status = "AgentStatus",
    printcolumn = r#"{"name":"Ready","type":"integer","jsonPath":".status.numberReady"}"#,
    printcolumn = r#"{"name":"Desired","type":"integer","jsonPath":".status.desiredNumberScheduled"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OVSDBServerSpec {
    /// Image for the ovsdb-server container (defaulted by the operator when empty)
    #[serde(default)]
    pub ovs_container_image: String,

    /// Debug switches
    #[serde(default)]
    pub debug: DebugSpec,

    /// Restricts the agent to nodes carrying these labels (empty = all nodes)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Physical network name to host NIC mapping
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nic_mappings: BTreeMap<String, String>,

    /// Compute resource bounds
    #[serde(default)]
    pub resources: ResourceRequirements,

    /// Single network attachment (deprecated, superseded by `networkAttachments`)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_attachment: String,

    /// Network attachments exposing the agent on additional networks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_attachments: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_spec_deserializes() {
        let spec: OVSDBServerSpec = serde_json::from_str("{}").unwrap();
        assert!(spec.ovs_container_image.is_empty());
        assert!(spec.node_selector.is_empty());
        assert!(spec.resources.limits.is_none());
    }

    #[test]
    fn resource_bounds_round_through_json() {
        let spec: OVSDBServerSpec = serde_json::from_str(
            r#"{"resources":{"limits":{"cpu":"1","memory":"1Gi"}},"networkAttachments":["tenant"]}"#,
        )
        .unwrap();
        let limits = spec.resources.limits.as_ref().unwrap();
        assert_eq!(limits.cpu.as_deref(), Some("1"));
        assert_eq!(limits.memory.as_deref(), Some("1Gi"));
        assert_eq!(spec.network_attachments, vec!["tenant".to_string()]);
    }
}
