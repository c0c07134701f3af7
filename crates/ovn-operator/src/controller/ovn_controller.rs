//! OVNController reconciler
//!
//! Rolls out the agent DaemonSet, then configures every running agent pod
//! through a one-shot Job on its node. The Job hash recorded per node in
//! status keeps a satisfied node from being configured again.

use std::collections::BTreeMap;
use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, info, instrument};

use ovn_common::crd::{AgentKind, AgentStatus, OVNController};
use ovn_common::kube_utils::OwnerReference;
use ovn_common::{Error, OVN_CONFIG_HASH_PREFIX};
use ovn_workload::{build_config_jobs, job_hash, AgentInstance};

use super::agent::{apply_agent, owner_reference, update_status, AppliedAgent, INPUT_HASH_KEY};
use super::{Context, JobCreation, ReconcileError, RESYNC_INTERVAL};

/// Status hash key of the configuration Job for `node`
pub fn config_hash_key(node: &str) -> String {
    format!("{}-{}", OVN_CONFIG_HASH_PREFIX, node)
}

/// Reconcile an OVNController resource
#[instrument(skip(cr, ctx), fields(name = %cr.name_any()))]
pub async fn reconcile_controller(
    cr: Arc<OVNController>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let instance = AgentInstance::try_from(&*cr)?;
    let owner = owner_reference(&*cr, AgentKind::Controller);
    let applied = apply_agent(instance, owner.clone(), &ctx).await?;

    let previous = cr.status.as_ref();
    let mut hash = BTreeMap::from([(INPUT_HASH_KEY.to_string(), applied.config_hash.clone())]);
    hash.extend(run_config_jobs(&cr, &applied, owner, previous, &ctx).await?);

    update_status(&ctx, &applied.instance, previous, applied.status(hash)).await?;

    info!(namespace = %applied.instance.namespace, "ovn-controller reconciled");
    Ok(Action::requeue(RESYNC_INTERVAL))
}

/// Create the configuration Jobs whose content changed since they last ran
///
/// The southbound endpoint is resolved before any pod is listed. Returns the
/// per-node Job hashes to record in status; nodes no longer running an agent
/// pod drop out of the map.
async fn run_config_jobs(
    cr: &OVNController,
    applied: &AppliedAgent,
    owner: Option<OwnerReference>,
    previous: Option<&AgentStatus>,
    ctx: &Context,
) -> Result<BTreeMap<String, String>, ReconcileError> {
    let namespace = &applied.instance.namespace;

    let sb_cluster = ctx
        .kube
        .get_southbound_cluster(namespace)
        .await?
        .ok_or_else(|| {
            Error::not_ready(
                "OVNDBCluster/SB",
                format!("no southbound database cluster in namespace {}", namespace),
            )
        })?;
    sb_cluster.internal_endpoint()?;
    let pods = ctx
        .kube
        .list_agent_instances(namespace, AgentKind::Controller)
        .await?;

    let mut resolved = cr.clone();
    resolved.spec.ovn_container_image = applied.instance.image().to_string();
    let jobs = build_config_jobs(&resolved, &sb_cluster, &pods, &applied.labels)?;

    let mut hashes = BTreeMap::new();
    for (pod, mut job) in pods.iter().zip(jobs) {
        let key = config_hash_key(&pod.node_name);
        let digest = job_hash(&job)?;
        let recorded = previous.and_then(|s| s.hash.get(&key));

        if recorded == Some(&digest) {
            debug!(node = %pod.node_name, job = %job.metadata.name, "config job up to date");
            hashes.insert(key, digest);
            continue;
        }

        job.metadata.owner_references.extend(owner.clone());
        match ctx.kube.create_job(&job).await? {
            JobCreation::Created => {
                info!(node = %pod.node_name, job = %job.metadata.name, "created config job");
                hashes.insert(key, digest);
            }
            JobCreation::AlreadyExists => {
                // Retried on a later pass once the previous Job has expired
                debug!(node = %pod.node_name, job = %job.metadata.name, "config job still present");
                if let Some(recorded) = recorded {
                    hashes.insert(key, recorded.clone());
                }
            }
        }
    }
    Ok(hashes)
}
