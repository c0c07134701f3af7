//! Host volume topology shared by the OVN agents
//!
//! All three agents on a node share one on-disk state tree rooted at
//! [`host_state_root`]. Paths depend only on the namespace, so re-deriving the
//! topology never relocates state, and two namespaces never share a directory.

use ovn_common::crd::AgentKind;

use crate::k8s::{Volume, VolumeMount};

/// Host directory under which every per-namespace state tree lives
pub const HOST_STATE_BASE: &str = "/var/home/core";

/// In-container path of the scripts ConfigMap
pub const SCRIPTS_MOUNT_PATH: &str = "/usr/local/bin/container-scripts";

/// Permission bits of the projected scripts (0755)
pub const SCRIPTS_DEFAULT_MODE: i32 = 0o755;

const DIRECTORY_OR_CREATE: &str = "DirectoryOrCreate";

/// Namespace-private state directories: (volume name, path below the root)
const STATE_DIRS: [(&str, &str); 6] = [
    ("etc-ovs", "etc/ovs"),
    ("var-run", "var/run/openvswitch"),
    ("var-log", "var/log/openvswitch"),
    ("var-lib", "var/lib/openvswitch"),
    ("var-run-ovn", "var/run/ovn"),
    ("var-log-ovn", "var/log/ovn"),
];

/// Host directory holding the agent state of one namespace
pub fn host_state_root(namespace: &str) -> String {
    format!("{}/{}", HOST_STATE_BASE, namespace)
}

/// Name of the ConfigMap carrying the agent scripts for workload `name`
pub fn scripts_config_map(name: &str) -> String {
    format!("{}-scripts", name)
}

/// Every volume an agent pod of workload `name` may mount
///
/// The host identity files come first, then the state directories (created on
/// first use), then the scripts bundle.
pub fn volumes(name: &str, namespace: &str) -> Vec<Volume> {
    let root = host_state_root(namespace);

    let mut volumes = vec![
        Volume::from_host_path("etc-machine-id", "/etc/machine-id", None),
        Volume::from_host_path("etc-localtime", "/etc/localtime", None),
    ];
    volumes.extend(STATE_DIRS.iter().map(|(vol, rel)| {
        Volume::from_host_path(*vol, format!("{}/{}", root, rel), Some(DIRECTORY_OR_CREATE))
    }));
    volumes.push(Volume::from_config_map(
        "scripts",
        scripts_config_map(name),
        Some(SCRIPTS_DEFAULT_MODE),
    ));
    volumes
}

/// Mounts of the agent container for `kind`
pub fn volume_mounts(kind: AgentKind) -> Vec<VolumeMount> {
    let mut mounts = vec![
        VolumeMount::readonly("etc-machine-id", "/etc/machine-id"),
        VolumeMount::readonly("etc-localtime", "/etc/localtime"),
    ];
    match kind {
        AgentKind::Controller => mounts.extend([
            VolumeMount::new("var-run", "/var/run/openvswitch"),
            VolumeMount::new("var-run-ovn", "/var/run/ovn"),
            VolumeMount::new("var-log-ovn", "/var/log/ovn"),
            VolumeMount::readonly("scripts", SCRIPTS_MOUNT_PATH),
        ]),
        AgentKind::DbServer => mounts.extend([
            VolumeMount::new("etc-ovs", "/etc/openvswitch"),
            VolumeMount::new("var-run", "/var/run/openvswitch"),
            VolumeMount::new("var-log", "/var/log/openvswitch"),
            VolumeMount::new("var-lib", "/var/lib/openvswitch"),
            VolumeMount::readonly("scripts", SCRIPTS_MOUNT_PATH),
        ]),
        AgentKind::Vswitchd => mounts.extend([
            VolumeMount::new("var-run", "/var/run/openvswitch"),
            VolumeMount::new("var-log", "/var/log/openvswitch"),
            VolumeMount::new("var-lib", "/var/lib/openvswitch"),
        ]),
    }
    mounts
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn host_paths(volumes: &[Volume]) -> Vec<String> {
        volumes
            .iter()
            .filter_map(|v| v.host_path.as_ref().map(|hp| hp.path.clone()))
            .collect()
    }

    #[test]
    fn topology_is_deterministic() {
        assert_eq!(volumes("ovn", "openstack"), volumes("ovn", "openstack"));
    }

    #[test]
    fn namespaces_never_share_state_paths() {
        let shared = ["/etc/machine-id", "/etc/localtime"];
        let a: BTreeSet<_> = host_paths(&volumes("ovn", "tenant-a"))
            .into_iter()
            .filter(|p| !shared.contains(&p.as_str()))
            .collect();
        let b: BTreeSet<_> = host_paths(&volumes("ovn", "tenant-b"))
            .into_iter()
            .filter(|p| !shared.contains(&p.as_str()))
            .collect();
        assert_eq!(a.len(), STATE_DIRS.len());
        assert!(a.is_disjoint(&b));
        assert!(a.iter().all(|p| p.starts_with("/var/home/core/tenant-a/")));
    }

    #[test]
    fn state_dirs_are_created_on_demand() {
        for vol in volumes("ovn", "openstack") {
            let Some(hp) = vol.host_path else { continue };
            let expected = if hp.path.starts_with("/etc/") {
                None
            } else {
                Some(DIRECTORY_OR_CREATE)
            };
            assert_eq!(hp.type_.as_deref(), expected, "volume {}", vol.name);
        }
    }

    #[test]
    fn scripts_come_from_named_config_map() {
        let vols = volumes("ovncontroller", "openstack");
        let scripts = vols.last().and_then(|v| v.config_map.clone()).unwrap();
        assert_eq!(scripts.name, "ovncontroller-scripts");
        assert_eq!(scripts.default_mode, Some(0o755));
    }

    #[test]
    fn host_identity_is_read_only_for_every_kind() {
        for kind in AgentKind::ALL {
            let mounts = volume_mounts(kind);
            for name in ["etc-machine-id", "etc-localtime"] {
                let m = mounts.iter().find(|m| m.name == name).unwrap();
                assert_eq!(m.read_only, Some(true), "{kind} {name}");
            }
        }
    }

    #[test]
    fn every_mount_has_a_volume() {
        let names: BTreeSet<_> = volumes("x", "ns").into_iter().map(|v| v.name).collect();
        for kind in AgentKind::ALL {
            for m in volume_mounts(kind) {
                assert!(names.contains(&m.name), "{kind} mounts unknown volume {}", m.name);
            }
        }
    }

    #[test]
    fn vswitchd_does_not_mount_scripts() {
        assert!(volume_mounts(AgentKind::Vswitchd)
            .iter()
            .all(|m| m.name != "scripts"));
        assert!(volume_mounts(AgentKind::Controller)
            .iter()
            .any(|m| m.name == "var-run-ovn"));
    }
}
