//! DaemonSet rollout shared by every agent kind, and the reconcilers of the
//! two Open vSwitch agents

use std::collections::BTreeMap;
use std::sync::Arc;

use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use tracing::{debug, info, instrument};

use ovn_common::crd::{AgentKind, AgentStatus, OVSDBServer, OVSvswitchd};
use ovn_common::kube_utils::{controller_owner_ref, OwnerReference};
use ovn_common::OVN_API_VERSION;
use ovn_workload::{
    build_daemonset, compute_config_hash, network_annotations, service_labels, AgentInstance,
};

use super::{Context, ReconcileError, RolloutStatus, RESYNC_INTERVAL};

/// Status hash key of the effective configuration hash
pub(crate) const INPUT_HASH_KEY: &str = "input";

/// Result of rolling out one agent DaemonSet
pub(crate) struct AppliedAgent {
    pub instance: AgentInstance,
    pub labels: BTreeMap<String, String>,
    pub config_hash: String,
    pub network_attachments: Vec<String>,
    pub rollout: RolloutStatus,
}

impl AppliedAgent {
    pub(crate) fn status(&self, hash: BTreeMap<String, String>) -> AgentStatus {
        AgentStatus {
            number_ready: self.rollout.number_ready,
            desired_number_scheduled: self.rollout.desired_number_scheduled,
            hash,
            network_attachments: self.network_attachments.clone(),
        }
    }
}

/// Owner reference pointing at the agent resource, once it has a UID
pub(crate) fn owner_reference<K: Resource>(resource: &K, kind: AgentKind) -> Option<OwnerReference> {
    resource.uid().map(|uid| {
        controller_owner_ref(
            OVN_API_VERSION,
            kind.resource_kind(),
            resource.name_any(),
            uid,
        )
    })
}

/// Resolve the image, render the DaemonSet and apply it
pub(crate) async fn apply_agent(
    instance: AgentInstance,
    owner: Option<OwnerReference>,
    ctx: &Context,
) -> Result<AppliedAgent, ReconcileError> {
    let kind = instance.kind();
    let instance = instance.with_default_image(ctx.images.image_for(kind));
    let config_hash = compute_config_hash(&instance)?;
    let labels = service_labels(kind);
    let network_attachments = instance.network_attachments();
    let annotations = network_annotations(&instance.namespace, &network_attachments)?;

    let mut daemonset = build_daemonset(&instance, &config_hash, &labels, &annotations);
    daemonset.metadata.owner_references.extend(owner);

    let rollout = ctx.kube.apply_daemonset(&daemonset).await?;
    debug!(
        kind = %kind,
        namespace = %instance.namespace,
        config_hash = %config_hash,
        ready = rollout.number_ready,
        desired = rollout.desired_number_scheduled,
        "applied agent DaemonSet"
    );

    Ok(AppliedAgent {
        instance,
        labels,
        config_hash,
        network_attachments,
        rollout,
    })
}

/// Patch status unless it already matches
pub(crate) async fn update_status(
    ctx: &Context,
    instance: &AgentInstance,
    previous: Option<&AgentStatus>,
    status: AgentStatus,
) -> Result<(), ReconcileError> {
    if previous == Some(&status) {
        return Ok(());
    }
    ctx.kube
        .patch_status(instance.kind(), &instance.namespace, &instance.name, &status)
        .await?;
    Ok(())
}

async fn reconcile_daemon(
    instance: AgentInstance,
    owner: Option<OwnerReference>,
    previous: Option<&AgentStatus>,
    ctx: &Context,
) -> Result<Action, ReconcileError> {
    let applied = apply_agent(instance, owner, ctx).await?;
    let hash = BTreeMap::from([(INPUT_HASH_KEY.to_string(), applied.config_hash.clone())]);
    update_status(ctx, &applied.instance, previous, applied.status(hash)).await?;

    info!(
        kind = %applied.instance.kind(),
        namespace = %applied.instance.namespace,
        "agent reconciled"
    );
    Ok(Action::requeue(RESYNC_INTERVAL))
}

/// Reconcile an OVSDBServer resource
#[instrument(skip(cr, ctx), fields(name = %cr.name_any()))]
pub async fn reconcile_db_server(
    cr: Arc<OVSDBServer>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let instance = AgentInstance::try_from(&*cr)?;
    let owner = owner_reference(&*cr, AgentKind::DbServer);
    reconcile_daemon(instance, owner, cr.status.as_ref(), &ctx).await
}

/// Reconcile an OVSvswitchd resource
#[instrument(skip(cr, ctx), fields(name = %cr.name_any()))]
pub async fn reconcile_vswitchd(
    cr: Arc<OVSvswitchd>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let instance = AgentInstance::try_from(&*cr)?;
    let owner = owner_reference(&*cr, AgentKind::Vswitchd);
    reconcile_daemon(instance, owner, cr.status.as_ref(), &ctx).await
}

#[cfg(test)]
mod tests {
    use ovn_common::crd::{OVSDBServerSpec, OVSvswitchdSpec, OVSDB_SERVER_OVS_CONTAINER_IMAGE};

    use super::*;
    use crate::controller::MockKubeClient;

    fn db_server(uid: Option<&str>) -> Arc<OVSDBServer> {
        let mut cr = OVSDBServer::new("ovsdbserver", OVSDBServerSpec::default());
        cr.metadata.namespace = Some("openstack".to_string());
        cr.metadata.uid = uid.map(str::to_string);
        Arc::new(cr)
    }

    fn rollout() -> RolloutStatus {
        RolloutStatus {
            number_ready: 2,
            desired_number_scheduled: 3,
        }
    }

    #[tokio::test]
    async fn applies_daemonset_with_default_image_and_owner() {
        let mut mock = MockKubeClient::new();
        mock.expect_apply_daemonset()
            .withf(|ds| {
                let c = &ds.spec.template.spec.containers[0];
                ds.metadata.name == "ovsdb-server"
                    && c.image == OVSDB_SERVER_OVS_CONTAINER_IMAGE
                    && ds.metadata.owner_references.len() == 1
                    && ds.metadata.owner_references[0].kind == "OVSDBServer"
            })
            .times(1)
            .returning(|_| Ok(rollout()));
        mock.expect_patch_status()
            .withf(|kind, ns, name, status| {
                *kind == AgentKind::DbServer
                    && ns == "openstack"
                    && name == "ovsdbserver"
                    && status.number_ready == 2
                    && status.desired_number_scheduled == 3
                    && status.hash.contains_key(INPUT_HASH_KEY)
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let ctx = Arc::new(Context::for_testing(Arc::new(mock)));
        let action = reconcile_db_server(db_server(Some("uid-1")), ctx).await.unwrap();
        assert_eq!(action, Action::requeue(RESYNC_INTERVAL));
    }

    #[tokio::test]
    async fn unchanged_status_is_not_patched() {
        let first = db_server(None);
        let ctx = Context::for_testing(Arc::new(MockKubeClient::new()));
        let instance = AgentInstance::try_from(&*first)
            .unwrap()
            .with_default_image(ctx.images.image_for(AgentKind::DbServer));
        let hash = compute_config_hash(&instance).unwrap();

        let mut cr = (*first).clone();
        cr.status = Some(AgentStatus {
            number_ready: 2,
            desired_number_scheduled: 3,
            hash: BTreeMap::from([(INPUT_HASH_KEY.to_string(), hash)]),
            network_attachments: Vec::new(),
        });

        let mut mock = MockKubeClient::new();
        mock.expect_apply_daemonset().times(1).returning(|_| Ok(rollout()));
        mock.expect_patch_status().times(0);

        let ctx = Arc::new(Context::for_testing(Arc::new(mock)));
        reconcile_db_server(Arc::new(cr), ctx).await.unwrap();
    }

    #[tokio::test]
    async fn network_attachments_reach_pods_and_status() {
        let mut cr = OVSvswitchd::new(
            "ovs",
            OVSvswitchdSpec {
                network_attachments: vec!["tenant".to_string()],
                ..Default::default()
            },
        );
        cr.metadata.namespace = Some("openstack".to_string());

        let mut mock = MockKubeClient::new();
        mock.expect_apply_daemonset()
            .withf(|ds| {
                ds.spec
                    .template
                    .metadata
                    .annotations
                    .contains_key(ovn_workload::helpers::NETWORKS_ANNOTATION)
            })
            .times(1)
            .returning(|_| Ok(RolloutStatus::default()));
        mock.expect_patch_status()
            .withf(|_, _, _, status| status.network_attachments == vec!["tenant".to_string()])
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let ctx = Arc::new(Context::for_testing(Arc::new(mock)));
        reconcile_vswitchd(Arc::new(cr), ctx).await.unwrap();
    }

    #[tokio::test]
    async fn apply_failure_skips_status() {
        let mut mock = MockKubeClient::new();
        mock.expect_apply_daemonset()
            .returning(|_| Err(ovn_common::Error::internal("apply refused")));
        mock.expect_patch_status().times(0);

        let ctx = Arc::new(Context::for_testing(Arc::new(mock)));
        let err = reconcile_db_server(db_server(None), ctx).await.unwrap_err();
        assert!(!err.is_not_ready());
    }

    #[tokio::test]
    async fn missing_namespace_is_rejected_before_apply() {
        let cr = Arc::new(OVSvswitchd::new("ovs", OVSvswitchdSpec::default()));
        let mut mock = MockKubeClient::new();
        mock.expect_apply_daemonset().times(0);

        let ctx = Arc::new(Context::for_testing(Arc::new(mock)));
        assert!(reconcile_vswitchd(cr, ctx).await.is_err());
    }
}
