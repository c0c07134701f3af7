//! Reconcilers for the OVN agent resources
//!
//! Each pass renders the agent DaemonSet from the resource, applies it, and
//! records the rollout in status. The ovn-controller pass additionally fans
//! out one configuration Job per running agent pod. Every cluster access goes
//! through [`KubeClient`] so the passes can be tested against a mock.

mod agent;
mod ovn_controller;

pub use agent::{reconcile_db_server, reconcile_vswitchd};
pub use ovn_controller::reconcile_controller;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::runtime::controller::Action;
use kube::{Client, Resource, ResourceExt};
#[cfg(test)]
use mockall::automock;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use ovn_common::crd::{AgentKind, AgentStatus, DbType, OVNController, OVNDBCluster, OVSDBServer, OVSvswitchd};
use ovn_common::kube_utils::{is_already_exists, is_not_found, HasApiResource};
use ovn_common::{Error, ImageDefaults, FIELD_MANAGER, OVN_API_VERSION, SERVICE_LABEL};
use ovn_workload::k8s::{DaemonSet, Job};
use ovn_workload::{NodeInstance, WorkloadError};

/// Delay before re-running a successful pass
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Delay before retrying a pass blocked on an unmet precondition
pub const NOT_READY_REQUEUE: Duration = Duration::from_secs(10);

/// Delay before retrying a failed pass
pub const ERROR_REQUEUE: Duration = Duration::from_secs(30);

/// Error returned by a reconcile pass
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Rendering failed
    #[error(transparent)]
    Workload(#[from] WorkloadError),

    /// Cluster access failed or a precondition is not met
    #[error(transparent)]
    Common(#[from] Error),
}

impl ReconcileError {
    /// Whether the pass is blocked on a precondition rather than broken
    pub fn is_not_ready(&self) -> bool {
        match self {
            Self::Workload(e) => e.is_not_ready(),
            Self::Common(e) => e.is_not_ready(),
        }
    }

    /// Whether a later pass with the same input may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Workload(e) => e.is_retryable(),
            Self::Common(e) => e.is_retryable(),
        }
    }
}

// =============================================================================
// Cluster access
// =============================================================================

/// Rollout progress of an applied DaemonSet
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RolloutStatus {
    /// Pods that are ready
    pub number_ready: i32,
    /// Nodes that should run a pod
    pub desired_number_scheduled: i32,
}

impl RolloutStatus {
    fn from_status(status: Option<&serde_json::Value>) -> Self {
        let field = |key: &str| {
            status
                .and_then(|s| s.get(key))
                .and_then(serde_json::Value::as_i64)
                .and_then(|v| i32::try_from(v).ok())
                .unwrap_or(0)
        };
        Self {
            number_ready: field("numberReady"),
            desired_number_scheduled: field("desiredNumberScheduled"),
        }
    }
}

/// Outcome of creating a configuration Job
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobCreation {
    /// The Job was created
    Created,
    /// A Job with the same name already exists; nothing was changed
    AlreadyExists,
}

/// Cluster operations used by the reconcilers
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// List the scheduled agent pods of `kind` in `namespace`
    ///
    /// Pods not yet bound to a node are left out.
    async fn list_agent_instances(
        &self,
        namespace: &str,
        kind: AgentKind,
    ) -> Result<Vec<NodeInstance>, Error>;

    /// Find the southbound database cluster in `namespace`
    async fn get_southbound_cluster(&self, namespace: &str) -> Result<Option<OVNDBCluster>, Error>;

    /// Server-side apply a DaemonSet and report its rollout
    async fn apply_daemonset(&self, daemonset: &DaemonSet) -> Result<RolloutStatus, Error>;

    /// Create a Job, treating an existing Job of the same name as a no-op
    async fn create_job(&self, job: &Job) -> Result<JobCreation, Error>;

    /// Replace the status of an agent resource
    ///
    /// Keys missing from `status.hash` are removed from the stored status.
    async fn patch_status(
        &self,
        kind: AgentKind,
        namespace: &str,
        name: &str,
        status: &AgentStatus,
    ) -> Result<(), Error>;
}

/// [`KubeClient`] backed by a kube-rs client
pub struct KubeClientImpl {
    client: Client,
}

impl KubeClientImpl {
    /// Create a new KubeClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn patch_status_of<K>(
        &self,
        kind: AgentKind,
        namespace: &str,
        name: &str,
        status: &AgentStatus,
    ) -> Result<(), Error>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Debug,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch_status(name, &params, &Patch::Apply(status_apply_body(kind, status)))
            .await?;
        Ok(())
    }
}

/// Server-side apply body for the status subresource of an agent resource
///
/// The whole status is sent on every apply, so hash entries this manager
/// stops sending are removed rather than merged.
fn status_apply_body(kind: AgentKind, status: &AgentStatus) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": OVN_API_VERSION,
        "kind": kind.resource_kind(),
        "status": status,
    })
}

#[async_trait]
impl KubeClient for KubeClientImpl {
    async fn list_agent_instances(
        &self,
        namespace: &str,
        kind: AgentKind,
    ) -> Result<Vec<NodeInstance>, Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let selector = format!("{}={}", SERVICE_LABEL, kind.service_name());
        let pods = api
            .list(&ListParams::default().labels(&selector))
            .await
            .map_err(|e| Error::observed_state(namespace, kind, e))?;

        Ok(pods
            .items
            .iter()
            .filter_map(|pod| {
                let node_name = pod.spec.as_ref()?.node_name.clone()?;
                Some(NodeInstance {
                    name: pod.name_any(),
                    node_name,
                })
            })
            .collect())
    }

    async fn get_southbound_cluster(&self, namespace: &str) -> Result<Option<OVNDBCluster>, Error> {
        let api: Api<OVNDBCluster> = Api::namespaced(self.client.clone(), namespace);
        match api.list(&ListParams::default()).await {
            Ok(list) => Ok(list
                .items
                .into_iter()
                .find(|cluster| cluster.spec.db_type == DbType::SB)),
            // The database cluster CRD is not installed yet
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_daemonset(&self, daemonset: &DaemonSet) -> Result<RolloutStatus, Error> {
        let ar = DaemonSet::api_resource();
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &daemonset.metadata.namespace, &ar);
        let json = serde_json::to_value(daemonset)
            .map_err(|e| Error::serialization_for_kind(DaemonSet::KIND, e.to_string()))?;
        let params = PatchParams::apply(FIELD_MANAGER).force();

        debug!(name = %daemonset.metadata.name, "applying DaemonSet");
        let applied = api
            .patch(&daemonset.metadata.name, &params, &Patch::Apply(&json))
            .await?;
        Ok(RolloutStatus::from_status(applied.data.get("status")))
    }

    async fn create_job(&self, job: &Job) -> Result<JobCreation, Error> {
        let ar = Job::api_resource();
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &job.metadata.namespace, &ar);
        let json = serde_json::to_value(job)
            .map_err(|e| Error::serialization_for_kind(Job::KIND, e.to_string()))?;
        let obj: DynamicObject = serde_json::from_value(json)?;

        match api.create(&PostParams::default(), &obj).await {
            Ok(_) => Ok(JobCreation::Created),
            Err(e) if is_already_exists(&e) => Ok(JobCreation::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn patch_status(
        &self,
        kind: AgentKind,
        namespace: &str,
        name: &str,
        status: &AgentStatus,
    ) -> Result<(), Error> {
        match kind {
            AgentKind::Controller => {
                self.patch_status_of::<OVNController>(kind, namespace, name, status)
                    .await
            }
            AgentKind::DbServer => {
                self.patch_status_of::<OVSDBServer>(kind, namespace, name, status)
                    .await
            }
            AgentKind::Vswitchd => {
                self.patch_status_of::<OVSvswitchd>(kind, namespace, name, status)
                    .await
            }
        }
    }
}

// =============================================================================
// Context
// =============================================================================

/// Shared context for the agent reconcilers
pub struct Context {
    /// Kubernetes access (trait object for testability)
    pub kube: Arc<dyn KubeClient>,
    /// Images used when a resource leaves its image empty
    pub images: ImageDefaults,
}

impl Context {
    /// Create a context backed by a real client
    pub fn new(client: Client, images: ImageDefaults) -> Self {
        Self {
            kube: Arc::new(KubeClientImpl::new(client)),
            images,
        }
    }

    /// Create a context for testing with a mock client
    pub fn for_testing(kube: Arc<dyn KubeClient>) -> Self {
        Self {
            kube,
            images: ImageDefaults::default(),
        }
    }
}

// =============================================================================
// Error policy
// =============================================================================

/// Requeue policy shared by the three reconcilers
///
/// An unmet precondition is part of normal convergence and only logged at
/// info; anything else is logged as an error.
pub fn error_policy<K>(resource: Arc<K>, error: &ReconcileError, _ctx: Arc<Context>) -> Action
where
    K: Resource,
{
    let name = resource.name_any();
    let namespace = resource.namespace().unwrap_or_default();
    if error.is_not_ready() {
        info!(%name, %namespace, %error, "waiting for precondition");
        return Action::requeue(NOT_READY_REQUEUE);
    }
    error!(?error, %name, %namespace, retryable = error.is_retryable(), "reconciliation failed");
    Action::requeue(ERROR_REQUEUE)
}
