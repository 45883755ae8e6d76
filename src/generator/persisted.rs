use serde_json::{json, Value};

use super::graph::{to_canonical_string, ResourceGraph};

pub(super) const CONFIG_RESOURCE_TYPE: &str = "template_file";
pub(super) const CONFIG_RESOURCE_NAME: &str = "webhook2lambda2sqs_config";
pub(super) const CONFIG_VAR: &str = "config_json";

/// Stores the configuration document in the state, where `terraform output`
/// and `terraform state show` can read it back after provisioning.
pub(super) fn embed_config(graph: &mut ResourceGraph, raw_config: &Value) {
    graph.add_resource(
        CONFIG_RESOURCE_TYPE,
        CONFIG_RESOURCE_NAME,
        json!({
            "template": format!("$${{{}}}", CONFIG_VAR),
            "vars": { CONFIG_VAR: escape_interpolation(&to_canonical_string(raw_config)) },
        }),
    );
}

/// Terraform would otherwise evaluate `${...}` and `%{...}` inside the text.
fn escape_interpolation(text: &str) -> String {
    text.replace("${", "$${").replace("%{", "%%{")
}

#[cfg(test)]
mod tests {
    use super::{embed_config, escape_interpolation, CONFIG_RESOURCE_NAME, CONFIG_RESOURCE_TYPE};
    use crate::generator::graph::ResourceGraph;
    use serde_json::{json, Value};

    #[test]
    fn stored_config_parses_back_to_the_original() {
        let raw = json!({
            "endpoints": {
                "foo": { "method": "POST", "queues": ["q1"] },
                "bar": { "method": "GET", "queues": ["q1", "q2"] }
            },
            "name_suffix": "-x"
        });
        let mut graph = ResourceGraph::new("us-east-1");
        embed_config(&mut graph, &raw);

        let resource = graph
            .resource(CONFIG_RESOURCE_TYPE, CONFIG_RESOURCE_NAME)
            .unwrap();
        assert_eq!(resource["template"], "$${config_json}");
        let stored: Value =
            serde_json::from_str(resource["vars"]["config_json"].as_str().unwrap()).unwrap();
        assert_eq!(stored, raw);
    }

    #[test]
    fn escapes_terraform_interpolation() {
        assert_eq!(escape_interpolation("a ${b} %{c}"), "a $${b} %%{c}");
        assert_eq!(escape_interpolation("plain $text"), "plain $text");
    }

    #[test]
    fn escaped_config_unescapes_to_the_original() {
        let raw = json!({
            "endpoints": { "foo": { "method": "POST", "queues": ["q1"] } },
            "aws_tags": { "x": "${y}", "t": "%{if z}" }
        });
        let mut graph = ResourceGraph::new("us-east-1");
        embed_config(&mut graph, &raw);

        let stored = graph.resource(CONFIG_RESOURCE_TYPE, CONFIG_RESOURCE_NAME).unwrap()["vars"]
            ["config_json"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(stored.contains("$${y}"));
        assert!(stored.contains("%%{if z}"));

        let unescaped = stored.replace("$${", "${").replace("%%{", "%{");
        let parsed: Value = serde_json::from_str(&unescaped).unwrap();
        assert_eq!(parsed, raw);
    }
}
