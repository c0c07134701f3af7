//! Shared Kubernetes utilities using kube-rs

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};

use crate::Error;

// =============================================================================
// ObjectMeta - Canonical Kubernetes metadata for all rendered objects
// =============================================================================

/// Standard Kubernetes ObjectMeta for rendered objects.
///
/// Empty collections are omitted so equal values serialize identically.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Resource name
    pub name: String,
    /// Resource namespace
    pub namespace: String,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Owner references (set by the caller that applies the object)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    /// Create new metadata with the managed-by label
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(
            crate::LABEL_MANAGED_BY.to_string(),
            crate::LABEL_MANAGED_BY_OVN.to_string(),
        );
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels,
            annotations: BTreeMap::new(),
            owner_references: Vec::new(),
        }
    }

    /// Add labels
    pub fn with_labels(mut self, labels: &BTreeMap<String, String>) -> Self {
        self.labels
            .extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Add an owner reference
    pub fn with_owner(mut self, owner: OwnerReference) -> Self {
        self.owner_references.push(owner);
        self
    }
}

/// Reference from a rendered object to the resource that owns it
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    /// API version of the owner
    pub api_version: String,
    /// Kind of the owner
    pub kind: String,
    /// Name of the owner
    pub name: String,
    /// UID of the owner
    pub uid: String,
    /// Whether the owner is the managing controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<bool>,
    /// Block owner deletion until this object is gone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_owner_deletion: Option<bool>,
}

/// Build a controller owner reference
pub fn controller_owner_ref(
    api_version: impl Into<String>,
    kind: impl Into<String>,
    name: impl Into<String>,
    uid: impl Into<String>,
) -> OwnerReference {
    OwnerReference {
        api_version: api_version.into(),
        kind: kind.into(),
        name: name.into(),
        uid: uid.into(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

// =============================================================================
// HasApiResource Trait
// =============================================================================

/// Trait for rendered types with a compile-time API version and kind.
///
/// Gives the `ApiResource` used to apply them through `Api<DynamicObject>`.
pub trait HasApiResource {
    /// Full API version (e.g. "apps/v1", "batch/v1")
    const API_VERSION: &'static str;
    /// Resource kind (e.g. "DaemonSet")
    const KIND: &'static str;

    /// Build an ApiResource from the type's constants.
    fn api_resource() -> ApiResource {
        build_api_resource(Self::API_VERSION, Self::KIND)
    }
}

/// Build an ApiResource from an apiVersion string and kind
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    };
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: format!("{}s", kind.to_lowercase()),
    }
}

// =============================================================================
// Hashing
// =============================================================================

/// Compute a deterministic hash of the input string, returning a 16-char hex digest.
///
/// Uses truncated SHA-256 for stability across Rust toolchain versions.
/// `DefaultHasher` is NOT guaranteed stable across Rust releases, and these
/// hashes are persisted in pod environments and resource status.
pub fn deterministic_hash(input: &str) -> String {
    use aws_lc_rs::digest;
    let hash = digest::digest(&digest::SHA256, input.as_bytes());
    hash.as_ref()[..8]
        .iter()
        .fold(String::with_capacity(16), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{:02x}", b);
            s
        })
}

// =============================================================================
// API error classification
// =============================================================================

/// Whether the API rejected a create because the object already exists
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}

/// Whether the API reported the object as missing
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

// =============================================================================
// Client construction
// =============================================================================

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a kube client from optional kubeconfig path with default timeouts
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to read kubeconfig: {}", e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::internal_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        None => Config::infer().await.map_err(|e| {
            Error::internal_with_context("create_client", format!("failed to infer config: {}", e))
        })?,
    };
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
    Client::try_from(config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: String::new(),
            reason: String::new(),
            code,
        })
    }

    #[test]
    fn deterministic_hash_is_stable_and_short() {
        let a = deterministic_hash("CONFIG_HASH=1");
        assert_eq!(a, deterministic_hash("CONFIG_HASH=1"));
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, deterministic_hash("CONFIG_HASH=2"));
    }

    #[test]
    fn object_meta_carries_managed_by_label() {
        let meta = ObjectMeta::new("ovn-controller", "openstack");
        assert_eq!(
            meta.labels.get(crate::LABEL_MANAGED_BY).map(String::as_str),
            Some(crate::LABEL_MANAGED_BY_OVN)
        );
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("ownerReferences").is_none());
        assert!(json.get("annotations").is_none());
    }

    #[test]
    fn owner_reference_marks_controller() {
        let owner = controller_owner_ref(crate::OVN_API_VERSION, "OVNController", "ovn", "uid-1");
        let json = serde_json::to_value(ObjectMeta::new("x", "ns").with_owner(owner)).unwrap();
        assert_eq!(json["ownerReferences"][0]["controller"], true);
        assert_eq!(json["ownerReferences"][0]["apiVersion"], "ovn.openstack.org/v1beta1");
    }

    #[test]
    fn api_resource_splits_group_and_version() {
        let ar = build_api_resource("apps/v1", "DaemonSet");
        assert_eq!(ar.group, "apps");
        assert_eq!(ar.version, "v1");
        assert_eq!(ar.plural, "daemonsets");

        let core = build_api_resource("v1", "Pod");
        assert_eq!(core.group, "");
        assert_eq!(core.plural, "pods");
    }

    #[test]
    fn classifies_api_errors() {
        assert!(is_already_exists(&api_error(409)));
        assert!(!is_already_exists(&api_error(404)));
        assert!(is_not_found(&api_error(404)));
        assert!(!is_not_found(&api_error(500)));
    }
}
