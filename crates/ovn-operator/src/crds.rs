//! CRD installation
//!
//! The operator installs the three agent CRDs on startup using server-side
//! apply, so the CRD versions always match the operator version. The
//! OVNDBCluster CRD belongs to the database operator and is never installed
//! here.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use ovn_common::crd::{OVNController, OVSDBServer, OVSvswitchd};
use ovn_common::FIELD_MANAGER;

/// CRD definition with name and resource
struct CrdDef {
    name: &'static str,
    crd: CustomResourceDefinition,
}

fn agent_crds() -> Vec<CrdDef> {
    vec![
        CrdDef {
            name: "ovncontrollers.ovn.openstack.org",
            crd: OVNController::crd(),
        },
        CrdDef {
            name: "ovsdbservers.ovn.openstack.org",
            crd: OVSDBServer::crd(),
        },
        CrdDef {
            name: "ovsvswitchds.ovn.openstack.org",
            crd: OVSvswitchd::crd(),
        },
    ]
}

/// Ensure the agent CRDs are installed
pub async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    for def in agent_crds() {
        tracing::info!("Installing {} CRD...", def.name);
        crds.patch(def.name, &params, &Patch::Apply(&def.crd))
            .await
            .map_err(|e| anyhow::anyhow!("failed to install {} CRD: {}", def.name, e))?;
    }

    tracing::info!("Agent CRDs installed/updated");
    Ok(())
}

/// Render every agent CRD as a multi-document YAML stream
pub fn crd_manifests() -> anyhow::Result<String> {
    let docs = agent_crds()
        .into_iter()
        .map(|def| {
            serde_yaml::to_string(&def.crd)
                .map_err(|e| anyhow::anyhow!("failed to serialize {} CRD: {}", def.name, e))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(docs.join("---\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crd_names_match_generated_metadata() {
        for def in agent_crds() {
            assert_eq!(def.crd.metadata.name.as_deref(), Some(def.name));
            assert_eq!(def.crd.spec.group, ovn_common::OVN_API_GROUP);
            assert_eq!(def.crd.spec.scope, "Namespaced");
        }
    }

    #[test]
    fn manifests_hold_one_document_per_agent_crd() {
        let yaml = crd_manifests().unwrap();
        assert_eq!(yaml.matches("---\n").count(), 2);
        assert!(yaml.contains("kind: OVNController"));
        assert!(yaml.contains("kind: OVSDBServer"));
        assert!(yaml.contains("kind: OVSvswitchd"));
        assert!(!yaml.contains("OVNDBCluster"));
    }
}
