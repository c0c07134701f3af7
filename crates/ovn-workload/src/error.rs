//! Rendering error types

use ovn_common::crd::AgentKind;

/// Error raised while rendering agent workloads
#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    /// The agent resource has no namespace
    #[error("missing namespace on {kind} '{name}'")]
    MissingNamespace {
        /// Agent kind of the resource
        kind: AgentKind,
        /// Resource name
        name: String,
    },

    /// A rendered object could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Shared error (e.g. an unresolved endpoint)
    #[error("{0}")]
    Common(#[from] ovn_common::Error),
}

impl WorkloadError {
    /// Whether the failure is an unmet precondition expected to clear on its own
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::Common(e) if e.is_not_ready())
    }

    /// Whether rendering the same input again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Common(e) if e.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_wrapped_not_ready_is_not_ready() {
        let not_ready = WorkloadError::from(ovn_common::Error::not_ready("OVNDBCluster/SB", "x"));
        assert!(not_ready.is_not_ready());
        assert!(not_ready.is_retryable());

        let missing = WorkloadError::MissingNamespace {
            kind: AgentKind::Vswitchd,
            name: "ovs".to_string(),
        };
        assert!(!missing.is_not_ready());
        assert!(!missing.is_retryable());
        assert_eq!(missing.to_string(), "missing namespace on ovs-vswitchd 'ovs'");
    }
}
