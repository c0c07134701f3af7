//! Content hashing, labels and annotations shared by the renderers

use std::collections::BTreeMap;

use ovn_common::crd::AgentKind;
use ovn_common::kube_utils::deterministic_hash;
use ovn_common::SERVICE_LABEL;
use serde::Serialize;

use crate::error::WorkloadError;
use crate::instance::{AgentInstance, AgentSpec};
use crate::k8s::Job;

/// Annotation through which Multus attaches additional networks
pub const NETWORKS_ANNOTATION: &str = "k8s.v1.cni.cncf.io/networks";

// =============================================================================
// Config Hash
// =============================================================================

#[derive(Serialize)]
struct HashInput<'a> {
    name: &'a str,
    namespace: &'a str,
    agent: &'a AgentSpec,
}

/// Compute the effective configuration hash of an agent resource.
///
/// Injected into the pod environment as `CONFIG_HASH` so a changed spec rolls
/// the agent pods. Covers the identity and spec only; resource labels and
/// annotations are not inputs.
pub fn compute_config_hash(instance: &AgentInstance) -> Result<String, WorkloadError> {
    let input = serde_json::to_string(&HashInput {
        name: &instance.name,
        namespace: &instance.namespace,
        agent: &instance.spec,
    })?;
    Ok(deterministic_hash(&input))
}

/// Hash of a rendered configuration Job
pub fn job_hash(job: &Job) -> Result<String, WorkloadError> {
    Ok(deterministic_hash(&serde_json::to_string(job)?))
}

// =============================================================================
// Labels and annotations
// =============================================================================

/// Labels selecting the pods of one agent kind
pub fn service_labels(kind: AgentKind) -> BTreeMap<String, String> {
    BTreeMap::from([(SERVICE_LABEL.to_string(), kind.service_name().to_string())])
}

#[derive(Serialize)]
struct NetworkSelection<'a> {
    name: &'a str,
    namespace: &'a str,
}

/// Pod annotations requesting the given network attachments
///
/// Empty when there are no attachments.
pub fn network_annotations(
    namespace: &str,
    attachments: &[String],
) -> Result<BTreeMap<String, String>, WorkloadError> {
    if attachments.is_empty() {
        return Ok(BTreeMap::new());
    }
    let selections: Vec<_> = attachments
        .iter()
        .map(|name| NetworkSelection { name, namespace })
        .collect();
    Ok(BTreeMap::from([(
        NETWORKS_ANNOTATION.to_string(),
        serde_json::to_string(&selections)?,
    )]))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ovn_common::crd::{OVNController, OVNControllerSpec};

    use super::*;

    fn controller(spec: OVNControllerSpec) -> OVNController {
        let mut cr = OVNController::new("ovn", spec);
        cr.metadata.namespace = Some("openstack".to_string());
        cr
    }

    fn hash_of(cr: &OVNController) -> String {
        compute_config_hash(&AgentInstance::try_from(cr).unwrap()).unwrap()
    }

    #[test]
    fn identical_spec_identical_hash() {
        let a = controller(OVNControllerSpec::default());
        let b = controller(OVNControllerSpec::default());
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn render_relevant_change_changes_hash() {
        let base = controller(OVNControllerSpec::default());
        let mut changed = OVNControllerSpec::default();
        changed
            .nic_mappings
            .insert("datacentre".to_string(), "eth1".to_string());
        assert_ne!(hash_of(&base), hash_of(&controller(changed)));

        let mut debug = OVNControllerSpec::default();
        debug.debug.service = true;
        assert_ne!(hash_of(&base), hash_of(&controller(debug)));
    }

    #[test]
    fn image_bridge_and_placement_change_hash() {
        let base = hash_of(&controller(OVNControllerSpec::default()));

        let image = OVNControllerSpec {
            ovn_container_image: "registry.local/ovn-controller:2".to_string(),
            ..Default::default()
        };
        assert_ne!(base, hash_of(&controller(image)));

        let mut bridge = OVNControllerSpec::default();
        bridge.external_ids.ovn_bridge = "br-ex".to_string();
        assert_ne!(base, hash_of(&controller(bridge)));

        let placement = OVNControllerSpec {
            node_selector: BTreeMap::from([("zone".to_string(), "a".to_string())]),
            ..Default::default()
        };
        assert_ne!(base, hash_of(&controller(placement)));
    }

    #[test]
    fn resource_annotations_do_not_change_hash() {
        let base = controller(OVNControllerSpec::default());
        let mut annotated = base.clone();
        annotated.metadata.annotations = Some(BTreeMap::from([(
            "note".to_string(),
            "unrelated".to_string(),
        )]));
        annotated.metadata.labels =
            Some(BTreeMap::from([("team".to_string(), "net".to_string())]));
        assert_eq!(hash_of(&base), hash_of(&annotated));
    }

    #[test]
    fn namespace_is_part_of_identity() {
        let a = controller(OVNControllerSpec::default());
        let mut b = a.clone();
        b.metadata.namespace = Some("other".to_string());
        assert_ne!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn network_annotation_lists_attachments() {
        let annotations =
            network_annotations("openstack", &["tenant".to_string()]).unwrap();
        assert_eq!(
            annotations.get(NETWORKS_ANNOTATION).map(String::as_str),
            Some(r#"[{"name":"tenant","namespace":"openstack"}]"#)
        );
        assert!(network_annotations("openstack", &[]).unwrap().is_empty());
    }

    #[test]
    fn service_label_names_the_agent() {
        assert_eq!(
            service_labels(AgentKind::DbServer).get("service").map(String::as_str),
            Some("ovsdb-server")
        );
    }
}
