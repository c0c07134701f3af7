//! Rendering of the OVN agent workloads
//!
//! Turns the agent resources into the Kubernetes objects that run them:
//! - one DaemonSet per agent kind, with mode-dependent commands and a
//!   content hash that rolls the pods when the spec changes
//! - one configuration Job per running ovn-controller pod
//! - the host volume topology shared by the agents on a node
//!
//! Everything here is pure. Reading the cluster and applying the output is
//! left to the operator.
//!
//! ```rust,ignore
//! let instance = AgentInstance::try_from(&*vswitchd)?.with_default_image(image);
//! let hash = compute_config_hash(&instance)?;
//! let ds = build_daemonset(&instance, &hash, &service_labels(instance.kind()), &annotations);
//! ```

pub mod config_job;
pub mod daemonset;
pub mod error;
pub mod helpers;
pub mod instance;
pub mod k8s;
pub mod mode;
pub mod volumes;

pub use config_job::{build_config_jobs, NodeInstance};
pub use daemonset::build_daemonset;
pub use error::WorkloadError;
pub use helpers::{compute_config_hash, job_hash, network_annotations, service_labels};
pub use instance::{AgentInstance, AgentSpec};
pub use mode::{ContainerCommands, Mode};
