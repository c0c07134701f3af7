//! OVNDBCluster CRD types
//!
//! The clustered northbound/southbound databases are reconciled elsewhere.
//! This operator only reads them: the southbound cluster's status publishes
//! the internal endpoint the controller agents connect to.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Which OVN database a cluster serves
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum DbType {
    /// Northbound database
    #[default]
    NB,
    /// Southbound database
    SB,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NB => write!(f, "NB"),
            Self::SB => write!(f, "SB"),
        }
    }
}

/// Read-only view of an OVN database cluster
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ovn.openstack.org",
    version = "v1beta1",
    kind = "OVNDBCluster",
    plural = "ovndbclusters",
    namespaced,
    status = "OVNDBClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct OVNDBClusterSpec {
    /// Database served by this cluster
    #[serde(default)]
    pub db_type: DbType,
}

/// Observed state of an OVN database cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OVNDBClusterStatus {
    /// Connection string reachable from inside the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_db_address: Option<String>,
}

impl OVNDBCluster {
    /// Resolve the internal connection endpoint from status
    ///
    /// Fails with a not-ready error until the database cluster publishes it.
    pub fn internal_endpoint(&self) -> Result<&str, Error> {
        self.status
            .as_ref()
            .and_then(|s| s.internal_db_address.as_deref())
            .filter(|addr| !addr.is_empty())
            .ok_or_else(|| {
                Error::not_ready(
                    format!("OVNDBCluster/{}", self.spec.db_type),
                    "internal DB endpoint not published yet",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sb_cluster(address: Option<&str>) -> OVNDBCluster {
        let mut cluster = OVNDBCluster::new(
            "ovndbcluster-sb",
            OVNDBClusterSpec { db_type: DbType::SB },
        );
        cluster.status = Some(OVNDBClusterStatus {
            internal_db_address: address.map(String::from),
        });
        cluster
    }

    #[test]
    fn resolves_published_endpoint() {
        let cluster = sb_cluster(Some("tcp:10.0.0.1:6642"));
        assert_eq!(cluster.internal_endpoint().unwrap(), "tcp:10.0.0.1:6642");
    }

    #[test]
    fn missing_status_is_not_ready() {
        let mut cluster = sb_cluster(None);
        cluster.status = None;
        let err = cluster.internal_endpoint().unwrap_err();
        assert!(err.is_not_ready());
        assert!(err.to_string().contains("OVNDBCluster/SB"));
    }

    #[test]
    fn empty_address_is_not_ready() {
        assert!(sb_cluster(Some("")).internal_endpoint().unwrap_err().is_not_ready());
    }
}
