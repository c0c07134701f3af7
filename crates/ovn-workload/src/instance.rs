//! Desired state of one agent resource, viewed independently of its kind

use std::collections::BTreeMap;

use kube::ResourceExt;
use ovn_common::crd::{
    AgentKind, OVNController, OVNControllerSpec, OVSDBServer, OVSDBServerSpec, OVSvswitchd,
    OVSvswitchdSpec, ResourceRequirements,
};
use serde::Serialize;

use crate::error::WorkloadError;

/// Kind-specific desired state
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "spec")]
pub enum AgentSpec {
    /// ovn-controller
    Controller(OVNControllerSpec),
    /// ovsdb-server
    DbServer(OVSDBServerSpec),
    /// ovs-vswitchd
    Vswitchd(OVSvswitchdSpec),
}

/// An agent resource ready to be rendered
#[derive(Clone, Debug, PartialEq)]
pub struct AgentInstance {
    /// Resource name
    pub name: String,
    /// Resource namespace
    pub namespace: String,
    /// Desired state
    pub spec: AgentSpec,
}

impl AgentInstance {
    /// Agent kind
    pub fn kind(&self) -> AgentKind {
        match self.spec {
            AgentSpec::Controller(_) => AgentKind::Controller,
            AgentSpec::DbServer(_) => AgentKind::DbServer,
            AgentSpec::Vswitchd(_) => AgentKind::Vswitchd,
        }
    }

    /// Container image
    pub fn image(&self) -> &str {
        match &self.spec {
            AgentSpec::Controller(s) => &s.ovn_container_image,
            AgentSpec::DbServer(s) => &s.ovs_container_image,
            AgentSpec::Vswitchd(s) => &s.ovs_container_image,
        }
    }

    /// Replace the image when it is empty
    pub fn with_default_image(mut self, default: &str) -> Self {
        let image = match &mut self.spec {
            AgentSpec::Controller(s) => &mut s.ovn_container_image,
            AgentSpec::DbServer(s) => &mut s.ovs_container_image,
            AgentSpec::Vswitchd(s) => &mut s.ovs_container_image,
        };
        if image.is_empty() {
            *image = default.to_string();
        }
        self
    }

    /// Whether the agent container should idle
    pub fn debug(&self) -> bool {
        match &self.spec {
            AgentSpec::Controller(s) => s.debug.service,
            AgentSpec::DbServer(s) => s.debug.service,
            AgentSpec::Vswitchd(s) => s.debug.service,
        }
    }

    /// Node label filter (empty = every node)
    pub fn node_selector(&self) -> &BTreeMap<String, String> {
        match &self.spec {
            AgentSpec::Controller(s) => &s.node_selector,
            AgentSpec::DbServer(s) => &s.node_selector,
            AgentSpec::Vswitchd(s) => &s.node_selector,
        }
    }

    /// Compute resource bounds
    pub fn resources(&self) -> &ResourceRequirements {
        match &self.spec {
            AgentSpec::Controller(s) => &s.resources,
            AgentSpec::DbServer(s) => &s.resources,
            AgentSpec::Vswitchd(s) => &s.resources,
        }
    }

    /// Requested network attachments
    ///
    /// The deprecated single attachment comes first; duplicates are dropped
    /// keeping the first occurrence.
    pub fn network_attachments(&self) -> Vec<String> {
        let (single, list) = match &self.spec {
            AgentSpec::Controller(s) => (&s.network_attachment, &s.network_attachments),
            AgentSpec::DbServer(s) => (&s.network_attachment, &s.network_attachments),
            AgentSpec::Vswitchd(s) => (&s.network_attachment, &s.network_attachments),
        };
        let mut out: Vec<String> = Vec::with_capacity(list.len() + 1);
        for att in std::iter::once(single).chain(list.iter()) {
            if !att.is_empty() && !out.contains(att) {
                out.push(att.clone());
            }
        }
        out
    }

    /// Service account the agent pods run as
    pub fn service_account(&self) -> String {
        format!("{}{}", self.kind().rbac_prefix(), self.name)
    }
}

fn identity<K: ResourceExt>(resource: &K, kind: AgentKind) -> Result<(String, String), WorkloadError> {
    let name = resource.name_any();
    let namespace = resource
        .namespace()
        .ok_or_else(|| WorkloadError::MissingNamespace {
            kind,
            name: name.clone(),
        })?;
    Ok((name, namespace))
}

impl TryFrom<&OVNController> for AgentInstance {
    type Error = WorkloadError;

    fn try_from(cr: &OVNController) -> Result<Self, Self::Error> {
        let (name, namespace) = identity(cr, AgentKind::Controller)?;
        Ok(Self {
            name,
            namespace,
            spec: AgentSpec::Controller(cr.spec.clone()),
        })
    }
}

impl TryFrom<&OVSDBServer> for AgentInstance {
    type Error = WorkloadError;

    fn try_from(cr: &OVSDBServer) -> Result<Self, Self::Error> {
        let (name, namespace) = identity(cr, AgentKind::DbServer)?;
        Ok(Self {
            name,
            namespace,
            spec: AgentSpec::DbServer(cr.spec.clone()),
        })
    }
}

impl TryFrom<&OVSvswitchd> for AgentInstance {
    type Error = WorkloadError;

    fn try_from(cr: &OVSvswitchd) -> Result<Self, Self::Error> {
        let (name, namespace) = identity(cr, AgentKind::Vswitchd)?;
        Ok(Self {
            name,
            namespace,
            spec: AgentSpec::Vswitchd(cr.spec.clone()),
        })
    }
}
