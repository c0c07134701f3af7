//! OVSvswitchd CRD types

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{AgentStatus, DebugSpec, ResourceRequirements};

/// Fall-back image for the ovs-vswitchd agent
pub const OVS_VSWITCHD_OVS_CONTAINER_IMAGE: &str =
    "quay.io/podified-antelope-centos9/openstack-ovn-base:current-podified";

/// Desired state of the per-node switching dataplane
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ovn.openstack.org",
    version = "v1beta1",
    kind = "OVSvswitchd",
    plural = "ovsvswitchds",
    namespaced,
    status = "AgentStatus",
    printcolumn = r#"{"name":"Ready","type":"integer","jsonPath":".status.numberReady"}"#,
    printcolumn = r#"{"name":"Desired","type":"integer","jsonPath":".status.desiredNumberScheduled"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OVSvswitchdSpec {
    /// Image for the ovs-vswitchd container (defaulted by the operator when empty)
    #[serde(default)]
    pub ovs_container_image: String,

    /// Debug switches
    #[serde(default)]
    pub debug: DebugSpec,

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
