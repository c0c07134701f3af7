//! Per-node ovn-controller configuration Jobs
//!
//! A configuration Job has to run next to a controller agent that already
//! exists, so the Job set is derived from the observed agent pods rather than
//! from the desired state alone: one Job per pod, pinned to the pod's node.

use std::collections::BTreeMap;

use ovn_common::crd::{AgentKind, OVNController, OVNDBCluster};
use ovn_common::kube_utils::{HasApiResource, ObjectMeta};
use tracing::debug;

use crate::daemonset::{privileged_context, NODE_NAME_FIELD, OVN_HOST_NAME_ENV};
use crate::error::WorkloadError;
use crate::instance::{AgentInstance, AgentSpec};
use crate::k8s::{
    Container, EnvVar, Job, JobSpec, PodMeta, PodSpec, PodTemplateSpec, ResourceRequirements,
};
use crate::volumes::{volume_mounts, volumes, SCRIPTS_MOUNT_PATH};

/// Name of the configuration container
pub const CONFIG_CONTAINER_NAME: &str = "ovn-config";

/// Suffix appended to the agent pod name to name its configuration Job
pub const CONFIG_JOB_SUFFIX: &str = "-config";

/// A running controller agent pod and the node it was scheduled to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeInstance {
    /// Pod name
    pub name: String,
    /// Node the pod runs on
    pub node_name: String,
}

/// Render one configuration Job per observed controller agent pod.
///
/// Fails without rendering anything when the southbound cluster has not
/// published its endpoint. No pods is not an error and yields no Jobs. The
/// image of `controller` must already be resolved.
pub fn build_config_jobs(
    controller: &OVNController,
    sb_cluster: &OVNDBCluster,
    pods: &[NodeInstance],
    labels: &BTreeMap<String, String>,
) -> Result<Vec<Job>, WorkloadError> {
    let endpoint = sb_cluster.internal_endpoint()?;
    let instance = AgentInstance::try_from(controller)?;
    let env = config_env(&instance, endpoint);

    let jobs: Vec<Job> = pods
        .iter()
        .map(|pod| build_config_job(&instance, pod, env.clone(), labels))
        .collect();

    debug!(
        namespace = %instance.namespace,
        jobs = jobs.len(),
        "rendered ovn-controller config jobs"
    );
    Ok(jobs)
}

fn build_config_job(
    instance: &AgentInstance,
    pod: &NodeInstance,
    env: Vec<EnvVar>,
    labels: &BTreeMap<String, String>,
) -> Job {
    let container = Container {
        name: CONFIG_CONTAINER_NAME.to_string(),
        image: instance.image().to_string(),
        command: Some(vec![format!("{}/init.sh", SCRIPTS_MOUNT_PATH)]),
        args: Some(Vec::new()),
        env,
        resources: Some(ResourceRequirements::from(instance.resources())),
        liveness_probe: None,
        lifecycle: None,
        volume_mounts: volume_mounts(AgentKind::Controller),
        security_context: Some(privileged_context()),
        termination_message_policy: None,
    };

    Job {
        api_version: Job::API_VERSION.to_string(),
        kind: Job::KIND.to_string(),
        metadata: ObjectMeta::new(config_job_name(&pod.name), &instance.namespace)
            .with_labels(labels),
        spec: JobSpec {
            ttl_seconds_after_finished: Some(0),
            template: PodTemplateSpec {
                metadata: PodMeta::default(),
                spec: PodSpec {
                    service_account_name: instance.service_account(),
                    containers: vec![container],
                    volumes: volumes(&instance.name, &instance.namespace),
                    node_selector: None,
                    node_name: Some(pod.node_name.clone()),
                    restart_policy: Some("OnFailure".to_string()),
                },
            },
        },
    }
}

/// Name of the configuration Job for an agent pod
pub fn config_job_name(pod_name: &str) -> String {
    format!("{}{}", pod_name, CONFIG_JOB_SUFFIX)
}

fn config_env(instance: &AgentInstance, endpoint: &str) -> Vec<EnvVar> {
    let AgentSpec::Controller(spec) = &instance.spec else {
        return Vec::new();
    };
    let ids = &spec.external_ids;
    let mut env = vec![
        EnvVar::literal(
            "EnableChassisAsGateway",
            ids.enable_chassis_as_gateway.to_string(),
        ),
        EnvVar::literal("OvnBridge", &ids.ovn_bridge),
        EnvVar::literal("OvnEncapType", &ids.ovn_encap_type),
        EnvVar::from_field(OVN_HOST_NAME_ENV, NODE_NAME_FIELD),
        EnvVar::literal("OvnRemote", endpoint),
        EnvVar::literal("PhysicalNetworks", spec.physical_networks()),
    ];
    env.sort_by(|a, b| a.name.cmp(&b.name));
    env
}

#[cfg(test)]
mod tests {
    use ovn_common::crd::{DbType, OVNControllerSpec, OVNDBClusterSpec, OVNDBClusterStatus};

    use super::*;
    use crate::helpers::service_labels;

    fn controller() -> OVNController {
        let mut cr = OVNController::new(
            "ovncontroller",
            OVNControllerSpec {
                ovn_container_image: "ovn:1".to_string(),
                nic_mappings: BTreeMap::from([
                    ("tenant".to_string(), "eth2".to_string()),
                    ("datacentre".to_string(), "eth1".to_string()),
                ]),
                ..Default::default()
            },
        );
        cr.metadata.namespace = Some("openstack".to_string());
        cr
    }

    fn sb(address: Option<&str>) -> OVNDBCluster {
        let mut cluster = OVNDBCluster::new(
            "ovndbcluster-sb",
            OVNDBClusterSpec { db_type: DbType::SB },
        );
        cluster.status = Some(OVNDBClusterStatus {
            internal_db_address: address.map(str::to_string),
        });
        cluster
    }

    fn pods(n: usize) -> Vec<NodeInstance> {
        (0..n)
            .map(|i| NodeInstance {
                name: format!("ovn-controller-{i}"),
                node_name: format!("worker-{i}"),
            })
            .collect()
    }

    fn env_value<'a>(job: &'a Job, name: &str) -> Option<&'a str> {
        job.spec.template.spec.containers[0]
            .env
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.value.as_deref())
    }

    #[test]
    fn one_job_per_pod_on_distinct_nodes() {
        let labels = service_labels(AgentKind::Controller);
        let jobs =
            build_config_jobs(&controller(), &sb(Some("tcp:10.0.0.1:6642")), &pods(3), &labels)
                .unwrap();
        assert_eq!(jobs.len(), 3);
        let nodes: std::collections::BTreeSet<_> = jobs
            .iter()
            .filter_map(|j| j.spec.template.spec.node_name.clone())
            .collect();
        assert_eq!(nodes.len(), 3);
        assert_eq!(jobs[0].metadata.name, "ovn-controller-0-config");
        assert_eq!(jobs[0].spec.template.spec.node_name.as_deref(), Some("worker-0"));
    }

    #[test]
    fn no_pods_no_jobs() {
        let jobs = build_config_jobs(
            &controller(),
            &sb(Some("tcp:10.0.0.1:6642")),
            &[],
            &BTreeMap::new(),
        )
        .unwrap();
        assert!(jobs.is_empty());
    }

    #[test]
    fn unpublished_endpoint_fails_fast() {
        let err = build_config_jobs(&controller(), &sb(None), &pods(2), &BTreeMap::new())
            .unwrap_err();
        assert!(err.is_not_ready());
    }

    #[test]
    fn env_carries_endpoint_and_chassis_settings() {
        let jobs =
            build_config_jobs(&controller(), &sb(Some("tcp:10.0.0.1:6642")), &pods(1), &BTreeMap::new())
                .unwrap();
        let job = &jobs[0];
        assert_eq!(env_value(job, "OvnRemote"), Some("tcp:10.0.0.1:6642"));
        assert_eq!(env_value(job, "OvnBridge"), Some("br-int"));
        assert_eq!(env_value(job, "OvnEncapType"), Some("geneve"));
        assert_eq!(env_value(job, "EnableChassisAsGateway"), Some("true"));
        assert_eq!(env_value(job, "PhysicalNetworks"), Some("datacentre tenant"));

        let names: Vec<_> = job.spec.template.spec.containers[0]
            .env
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn host_name_resolved_at_task_start() {
        let jobs =
            build_config_jobs(&controller(), &sb(Some("tcp:x:6642")), &pods(1), &BTreeMap::new())
                .unwrap();
        let host = jobs[0].spec.template.spec.containers[0]
            .env
            .iter()
            .find(|e| e.name == "OvnHostName")
            .unwrap();
        assert!(host.value.is_none());
        assert!(host.value_from.is_some());
    }

    #[test]
    fn job_expires_and_retries_in_place() {
        let jobs =
            build_config_jobs(&controller(), &sb(Some("tcp:x:6642")), &pods(1), &BTreeMap::new())
                .unwrap();
        let job = &jobs[0];
        assert_eq!(job.spec.ttl_seconds_after_finished, Some(0));
        assert_eq!(job.spec.template.spec.restart_policy.as_deref(), Some("OnFailure"));
        let c = &job.spec.template.spec.containers[0];
        assert_eq!(c.name, "ovn-config");
        assert_eq!(
            c.command.as_deref(),
            Some(&["/usr/local/bin/container-scripts/init.sh".to_string()][..])
        );
        assert_eq!(c.image, "ovn:1");
        assert_eq!(job.spec.template.spec.service_account_name, "ovncontroller-ovncontroller");
    }
}
