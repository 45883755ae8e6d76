use serde_json::json;
use sha2::{Digest, Sha256};

use super::graph::{to_canonical_string, ResourceGraph, ResourceRef, TerraformConfig};
use crate::config::{BASE_NAME, VERSION};

pub(super) const DEPLOYMENT_TYPE: &str = "aws_api_gateway_deployment";
pub(super) const DEPLOYMENT_NAME: &str = "depl";

/// Describes the deployment by a digest of everything declared so far, so
/// any change to the API yields a new deployment instead of a stale one.
pub(super) fn description(graph: &ResourceGraph) -> String {
    let digest = Sha256::digest(to_canonical_string(&graph.resources_value()).as_bytes());
    let digest = format!("{:x}", digest);
    format!("{} v{} config {}", BASE_NAME, VERSION, &digest[..16])
}

/// Declares the deployment, depending on every resource already in the
/// graph, and seals the graph. Taking the graph by value means no builder
/// can add a resource the deployment would not wait for.
pub(super) fn build_deployment(
    mut graph: ResourceGraph,
    rest_api: &ResourceRef,
    description: &str,
    stage_name: &str,
) -> TerraformConfig {
    let depends_on = graph.qualified_names();
    tracing::debug!("Deployment depends on {} resources", depends_on.len());

    let deployment = graph.add_resource(
        DEPLOYMENT_TYPE,
        DEPLOYMENT_NAME,
        json!({
            "rest_api_id": rest_api.attr("id"),
            "description": description,
            "stage_name": stage_name,
            "depends_on": depends_on,
        }),
    );
    graph.add_output("deployment_id", deployment.attr("id"));

    graph.seal()
}
