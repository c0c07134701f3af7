//! Per-node agent DaemonSet rendering

use std::collections::BTreeMap;

use ovn_common::crd::AgentKind;
use ovn_common::kube_utils::{HasApiResource, ObjectMeta};

use crate::instance::AgentInstance;
use crate::k8s::{
    Capabilities, Container, DaemonSet, DaemonSetSpec, EnvVar, K8sSecurityContext,
    LabelSelector, Lifecycle, PodMeta, PodSpec, PodTemplateSpec, ResourceRequirements,
};
use crate::mode::Mode;
use crate::volumes::{volume_mounts, volumes};

/// Environment key carrying the effective configuration hash
pub const CONFIG_HASH_ENV: &str = "CONFIG_HASH";

/// Environment key carrying the node the pod runs on
pub const OVN_HOST_NAME_ENV: &str = "OvnHostName";

/// Downward field path of the pod's node
pub const NODE_NAME_FIELD: &str = "spec.nodeName";

/// Capabilities every agent container is granted
pub const AGENT_CAPABILITIES: [&str; 3] = ["NET_ADMIN", "SYS_ADMIN", "SYS_NICE"];

/// Render the DaemonSet running `instance`'s agent on every selected node.
///
/// Pure: equal inputs give equal output. The image must already be
/// resolved. `labels` become the pod selector and pod labels, `annotations`
/// the pod annotations.
pub fn build_daemonset(
    instance: &AgentInstance,
    config_hash: &str,
    labels: &BTreeMap<String, String>,
    annotations: &BTreeMap<String, String>,
) -> DaemonSet {
    let kind = instance.kind();
    let commands = Mode::from_debug(instance.debug()).commands(kind);

    let container = Container {
        name: kind.container_name().to_string(),
        image: instance.image().to_string(),
        command: Some(commands.command),
        args: Some(commands.args),
        env: agent_env(kind, config_hash),
        resources: Some(ResourceRequirements::from(instance.resources())),
        liveness_probe: commands.liveness_probe,
        lifecycle: Some(Lifecycle::pre_stop_exec(commands.pre_stop)),
        volume_mounts: volume_mounts(kind),
        security_context: Some(privileged_context()),
        termination_message_policy: Some("FallbackToLogsOnError".to_string()),
    };

    let node_selector = instance.node_selector();

    DaemonSet {
        api_version: DaemonSet::API_VERSION.to_string(),
        kind: DaemonSet::KIND.to_string(),
        metadata: ObjectMeta::new(kind.service_name(), &instance.namespace).with_labels(labels),
        spec: DaemonSetSpec {
            selector: LabelSelector {
                match_labels: labels.clone(),
            },
            template: PodTemplateSpec {
                metadata: PodMeta {
                    labels: labels.clone(),
                    annotations: annotations.clone(),
                },
                spec: PodSpec {
                    service_account_name: instance.service_account(),
                    containers: vec![container],
                    volumes: volumes(&instance.name, &instance.namespace),
                    node_selector: (!node_selector.is_empty()).then(|| node_selector.clone()),
                    node_name: None,
                    restart_policy: None,
                },
            },
        },
    }
}

/// Privileged root context with the agent capabilities
pub(crate) fn privileged_context() -> K8sSecurityContext {
    K8sSecurityContext {
        capabilities: Some(Capabilities {
            add: Some(AGENT_CAPABILITIES.iter().map(|c| c.to_string()).collect()),
            drop: Some(Vec::new()),
        }),
        privileged: Some(true),
        run_as_user: Some(0),
    }
}

fn agent_env(kind: AgentKind, config_hash: &str) -> Vec<EnvVar> {
    let mut env = vec![EnvVar::literal(CONFIG_HASH_ENV, config_hash)];
    if kind == AgentKind::Controller {
        env.push(EnvVar::from_field(OVN_HOST_NAME_ENV, NODE_NAME_FIELD));
    }
    env.sort_by(|a, b| a.name.cmp(&b.name));
    env
}
