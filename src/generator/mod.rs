//! Builds the Terraform configuration for the webhook bridge.
//!
//! [`TerraformGenerator::generate`] is the only way to produce a
//! [`TerraformConfig`]. It runs the builders in one fixed order:
//!
//! 1. IAM roles and policies
//! 2. the Lambda function
//! 3. the REST API and its response models
//! 4. one set of gateway resources per endpoint, sorted by name
//! 5. the persisted configuration
//! 6. the deployment, which depends on everything above and seals the graph

mod deployment;
mod gateway;
mod graph;
mod iam;
mod lambda;
mod models;
mod persisted;
mod templates;

pub use graph::{ResourceGraph, ResourceRef, TerraformConfig};

use tracing::info;

use crate::aws::Identity;
use crate::config::LoadedConfig;

pub struct TerraformGenerator<'a> {
    loaded: &'a LoadedConfig,
    identity: &'a Identity,
}

impl<'a> TerraformGenerator<'a> {
    pub fn new(loaded: &'a LoadedConfig, identity: &'a Identity) -> Self {
        Self { loaded, identity }
    }

    pub fn generate(&self) -> TerraformConfig {
        let config = &self.loaded.config;
        let identity = self.identity;
        let resource_name = config.resource_name();
        let stage_name = config.stage_name();
        let endpoints = config.endpoints();
        info!(
            "Generating Terraform configuration for {} ({} endpoints, stage {})",
            resource_name,
            endpoints.len(),
            stage_name
        );

        let mut graph = ResourceGraph::new(&identity.region);
        if let Some(remote_state) = &config.terraform_remote_state {
            graph.set_backend(&remote_state.backend);
        }

        let roles = iam::build_roles(&mut graph, identity, &resource_name, &endpoints);
        let function =
            lambda::build_function(&mut graph, &resource_name, &roles.execution, &config.tags());
        let rest_api = gateway::build_rest_api(&mut graph, identity, &resource_name, &stage_name);
        let models = models::build_models(&mut graph, &rest_api);

        let api = gateway::Gateway {
            rest_api,
            function,
            invoke_role: roles.invocation,
            models,
        };
        for endpoint in &endpoints {
            gateway::build_endpoint(&mut graph, identity, &api, &endpoint.name, endpoint.method);
        }

        persisted::embed_config(&mut graph, &self.loaded.raw);

        let description = deployment::description(&graph);
        deployment::build_deployment(graph, &api.rest_api, &description, &stage_name)
    }
}
