//! OVNController CRD types
//!
//! Declares the per-node `ovn-controller` agent together with the settings its
//! one-shot configuration tasks write into the local Open vSwitch database.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{AgentStatus, DebugSpec, ResourceRequirements};

/// Fall-back image for the ovn-controller agent
pub const OVN_CONTROLLER_CONTAINER_IMAGE: &str =
    "quay.io/podified-antelope-centos9/openstack-ovn-controller:current-podified";

// =============================================================================
// External IDs
// =============================================================================

/// Chassis settings stored as `external_ids` in the local Open vSwitch database
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIds {
    /// Chassis system ID ("random" lets the agent generate one)
    #[serde(default = "default_system_id")]
    pub system_id: String,

    /// Integration bridge name
    #[serde(default = "default_ovn_bridge")]
    pub ovn_bridge: String,

    /// Tunnel encapsulation type
    #[serde(default = "default_encap_type")]
    pub ovn_encap_type: String,

    /// Whether the chassis may host gateway ports
    #[serde(default = "default_true")]
    pub enable_chassis_as_gateway: bool,
}

fn default_system_id() -> String {
    "random".to_string()
}

fn default_ovn_bridge() -> String {
    "br-int".to_string()
}

fn default_encap_type() -> String {
    "geneve".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ExternalIds {
    fn default() -> Self {
        Self {
            system_id: default_system_id(),
            ovn_bridge: default_ovn_bridge(),
            ovn_encap_type: default_encap_type(),
            enable_chassis_as_gateway: true,
        }
    }
}

// =============================================================================
// CRD
// =============================================================================

/// Desired state of the ovn-controller agent fleet
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ovn.openstack.org",
    version = "v1beta1",
    kind = "OVNController",
    plural = "ovncontrollers",
    namespaced,
    status = "AgentStatus",
    printcolumn = r#"{"name":"Ready","type":"integer","jsonPath":".status.numberReady"}"#,
    printcolumn = r#"{"name":"Desired","type":"integer","jsonPath":".status.desiredNumberScheduled"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OVNControllerSpec {
    /// Image for the agent and its configuration tasks (defaulted by the operator when empty)
    #[serde(default)]
    pub ovn_container_image: String,

    /// Debug switches
    #[serde(default)]
    pub debug: DebugSpec,

    /// Chassis settings written by the configuration tasks
    #[serde(default, rename = "external-ids")]
    pub external_ids: ExternalIds,

    /// Physical network name to host NIC mapping
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nic_mappings: BTreeMap<String, String>,

    /// Restricts the agent to nodes carrying these labels (empty = all nodes)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

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

impl OVNControllerSpec {
    /// Physical network names, sorted, joined by a single space
    ///
    /// Each physical network is served by a bridge named after it, so only
    /// the ordering of names matters to the configuration script.
    pub fn physical_networks(&self) -> String {
        self.nic_mappings
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_ids_default_when_omitted() {
        let spec: OVNControllerSpec = serde_json::from_str(r#"{"ovnContainerImage":"img"}"#).unwrap();
        assert_eq!(spec.external_ids.ovn_bridge, "br-int");
        assert_eq!(spec.external_ids.ovn_encap_type, "geneve");
        assert_eq!(spec.external_ids.system_id, "random");
        assert!(spec.external_ids.enable_chassis_as_gateway);
        assert!(!spec.debug.service);
    }

    #[test]
    fn partial_external_ids_keep_other_defaults() {
        let spec: OVNControllerSpec = serde_json::from_str(
            r#"{"external-ids":{"ovnEncapType":"vxlan","enableChassisAsGateway":false}}"#,
        )
        .unwrap();
        assert_eq!(spec.external_ids.ovn_encap_type, "vxlan");
        assert_eq!(spec.external_ids.ovn_bridge, "br-int");
        assert!(!spec.external_ids.enable_chassis_as_gateway);
    }

    #[test]
    fn physical_networks_are_sorted() {
        let spec = OVNControllerSpec {
            nic_mappings: BTreeMap::from([
                ("tenant".to_string(), "eth2".to_string()),
                ("datacentre".to_string(), "eth1".to_string()),
            ]),
            ..Default::default()
        };
        assert_eq!(spec.physical_networks(), "datacentre tenant");
    }

    #[test]
    fn no_mappings_yield_empty_physical_networks() {
        assert_eq!(OVNControllerSpec::default().physical_networks(), "");
    }
}
