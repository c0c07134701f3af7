//! Custom Resource Definitions for the OVN agent operator

mod controller;
mod db_cluster;
mod ovs_vswitchd;
mod ovsdb_server;
mod types;

pub use controller::{ExternalIds, OVNController, OVNControllerSpec, OVN_CONTROLLER_CONTAINER_IMAGE};
pub use db_cluster::{DbType, OVNDBCluster, OVNDBClusterSpec, OVNDBClusterStatus};
pub use ovs_vswitchd::{OVSvswitchd, OVSvswitchdSpec, OVS_VSWITCHD_OVS_CONTAINER_IMAGE};
pub use ovsdb_server::{OVSDBServer, OVSDBServerSpec, OVSDB_SERVER_OVS_CONTAINER_IMAGE};
pub use types::{AgentKind, AgentStatus, DebugSpec, ResourceQuantity, ResourceRequirements};
