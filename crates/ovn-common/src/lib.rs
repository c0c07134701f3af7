//! Common types for the OVN agent operator: CRDs, errors, and utilities

#![warn(missing_docs)]

pub mod crd;
pub mod defaults;
pub mod error;
pub mod kube_utils;
pub mod telemetry;

pub use defaults::ImageDefaults;
pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group of every OVN custom resource
pub const OVN_API_GROUP: &str = "ovn.openstack.org";

/// API version of every OVN custom resource
pub const OVN_API_VERSION: &str = "ovn.openstack.org/v1beta1";

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "ovn-operator";

/// Label key used to select the pods of one agent kind (`service=<agent>`)
pub const SERVICE_LABEL: &str = "service";

/// Label key identifying the owning operator
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value of [`LABEL_MANAGED_BY`] on every rendered object
pub const LABEL_MANAGED_BY_OVN: &str = "ovn-operator";

/// Status hash key prefix for per-node controller configuration tasks
pub const OVN_CONFIG_HASH_PREFIX: &str = "ovncontroller-config";
