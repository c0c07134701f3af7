//! Container image defaults
//!
//! Built once at startup from the environment and threaded through the
//! controller context. An agent resource with an empty image is rendered with
//! the default for its kind.

use crate::crd::{
    AgentKind, OVN_CONTROLLER_CONTAINER_IMAGE, OVSDB_SERVER_OVS_CONTAINER_IMAGE,
    OVS_VSWITCHD_OVS_CONTAINER_IMAGE,
};

/// Environment variable overriding the ovn-controller image
pub const OVN_CONTROLLER_IMAGE_ENV: &str = "RELATED_IMAGE_OVN_CONTROLLER_IMAGE_URL_DEFAULT";
/// Environment variable overriding the ovsdb-server image
pub const OVSDB_SERVER_IMAGE_ENV: &str = "RELATED_IMAGE_OVSDB_SERVER_OVS_IMAGE_URL_DEFAULT";
/// Environment variable overriding the ovs-vswitchd image
pub const OVS_VSWITCHD_IMAGE_ENV: &str = "RELATED_IMAGE_OVS_VSWITCHD_OVS_IMAGE_URL_DEFAULT";

/// Default container image per agent kind
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageDefaults {
    /// Image for ovn-controller and its configuration tasks
    pub controller: String,
    /// Image for ovsdb-server
    pub db_server: String,
    /// Image for ovs-vswitchd
    pub vswitchd: String,
}

impl Default for ImageDefaults {
    fn default() -> Self {
        Self {
            controller: OVN_CONTROLLER_CONTAINER_IMAGE.to_string(),
            db_server: OVSDB_SERVER_OVS_CONTAINER_IMAGE.to_string(),
            vswitchd: OVS_VSWITCHD_OVS_CONTAINER_IMAGE.to_string(),
        }
    }
}

impl ImageDefaults {
    /// Read the defaults from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the defaults through `lookup`, falling back to the built-in images
    ///
    /// Unset and empty values both fall back.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let builtin = Self::default();
        let pick = |kind: AgentKind, fallback: String| {
            lookup(kind.image_env_key())
                .filter(|value| !value.is_empty())
                .unwrap_or(fallback)
        };
        Self {
            controller: pick(AgentKind::Controller, builtin.controller),
            db_server: pick(AgentKind::DbServer, builtin.db_server),
            vswitchd: pick(AgentKind::Vswitchd, builtin.vswitchd),
        }
    }

    /// Default image for an agent kind
    pub fn image_for(&self, kind: AgentKind) -> &str {
        match kind {
            AgentKind::Controller => &self.controller,
            AgentKind::DbServer => &self.db_server,
            AgentKind::Vswitchd => &self.vswitchd,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn unset_environment_uses_builtin_images() {
        let defaults = ImageDefaults::from_lookup(|_| None);
        assert_eq!(defaults, ImageDefaults::default());
        assert_eq!(
            defaults.image_for(AgentKind::Controller),
            OVN_CONTROLLER_CONTAINER_IMAGE
        );
    }

    #[test]
    fn environment_overrides_per_kind() {
        let env = HashMap::from([
            (OVSDB_SERVER_IMAGE_ENV, "registry.local/ovs:1"),
            (OVN_CONTROLLER_IMAGE_ENV, ""),
        ]);
        let defaults = ImageDefaults::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(defaults.image_for(AgentKind::DbServer), "registry.local/ovs:1");
        assert_eq!(
            defaults.image_for(AgentKind::Controller),
            OVN_CONTROLLER_CONTAINER_IMAGE
        );
        assert_eq!(
            defaults.image_for(AgentKind::Vswitchd),
            OVS_VSWITCHD_OVS_CONTAINER_IMAGE
        );
    }
}
