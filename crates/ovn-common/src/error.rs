//! Error types for the OVN agent operator
//!
//! Every failure is scoped to one reconcile attempt. Variants carry enough
//! context (namespace, agent kind, resource) to diagnose a failed pass from
//! the logs alone; the outer control loop decides when to retry.

use thiserror::Error;

use crate::crd::AgentKind;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for OVN operator operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A precondition is not met yet (e.g. the southbound endpoint is unpublished)
    ///
    /// Expected during convergence; the caller retries on the next resync.
    #[error("{resource} not ready: {message}")]
    NotReady {
        /// Resource that is not ready yet
        resource: String,
        /// What is missing
        message: String,
    },

    /// Listing the observed agent instances failed
    #[error("failed to list {kind} instances in namespace {namespace}: {source}")]
    ObservedState {
        /// Namespace that was queried
        namespace: String,
        /// Agent kind whose instances were listed
        kind: AgentKind,
        /// The underlying kube-rs error
        #[source]
        source: kube::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g. "create_client", "telemetry")
        context: String,
    },
}

impl Error {
    /// Create a not-ready error for the given resource
    pub fn not_ready(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::NotReady {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Wrap a failed instance listing with its namespace and agent kind
    pub fn observed_state(namespace: impl Into<String>, kind: AgentKind, source: kube::Error) -> Self {
        Self::ObservedState {
            namespace: namespace.into(),
            kind,
            source,
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Whether this is a precondition-not-ready failure rather than a defect
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }

    /// Whether retrying the same reconcile later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Kube { .. } | Self::NotReady { .. } | Self::ObservedState { .. } => true,
            Self::Serialization { .. } | Self::Internal { .. } => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_is_retryable() {
        let err = Error::not_ready("OVNDBCluster/SB", "internal DB endpoint not published");
        assert!(err.is_not_ready());
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "OVNDBCluster/SB not ready: internal DB endpoint not published"
        );
    }

    #[test]
    fn serialization_is_not_retryable() {
        let err = Error::serialization_for_kind("DaemonSet", "bad value");
        assert!(!err.is_retryable());
        assert!(!err.is_not_ready());
        match err {
            Error::Serialization { kind, .. } => assert_eq!(kind.as_deref(), Some("DaemonSet")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn internal_defaults_context() {
        match Error::internal("boom") {
            Error::Internal { context, .. } => assert_eq!(context, UNKNOWN_CONTEXT),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn observed_state_names_namespace_and_kind() {
        let source = kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "forbidden".to_string(),
            reason: "Forbidden".to_string(),
            code: 403,
        });
        let err = Error::observed_state("openstack", AgentKind::Controller, source);
        assert!(err.is_retryable());
        let msg = err.to_string();
        assert!(msg.contains("openstack"));
        assert!(msg.contains("ovn-controller"));
    }
}
