use serde_json::json;

use super::graph::{ResourceGraph, ResourceRef};
use super::models::Models;
use super::templates::{
    ERROR_RESPONSE_TEMPLATE, ERROR_SELECTION_PATTERN, REQUEST_TEMPLATE, SUCCESS_RESPONSE_TEMPLATE,
};
use crate::aws::Identity;
use crate::config::{HttpMethod, PROJECT_URL};

const SUCCESS_STATUS: &str = "202";
const ERROR_STATUS: &str = "500";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Resources every endpoint refers back to.
pub(super) struct Gateway {
    pub rest_api: ResourceRef,
    pub function: ResourceRef,
    pub invoke_role: ResourceRef,
    pub models: Models,
}

pub(super) fn build_rest_api(
    graph: &mut ResourceGraph,
    identity: &Identity,
    resource_name: &str,
    stage_name: &str,
) -> ResourceRef {
    let rest_api = graph.add_resource(
        "aws_api_gateway_rest_api",
        "rest_api",
        json!({
            "name": resource_name,
            "description": format!("Webhooks managed by {}", PROJECT_URL),
        }),
    );
    graph.add_output("rest_api_id", rest_api.attr("id"));
    graph.add_output(
        "base_url",
        format!(
            "https://{}.execute-api.{}.amazonaws.com/{}/",
            rest_api.attr("id"),
            identity.region,
            stage_name
        ),
    );

    rest_api
}

/// Declares the path, method, responses and integration of one endpoint.
/// Method-scoped resources are named `{name}_{METHOD}`.
pub(super) fn build_endpoint(
    graph: &mut ResourceGraph,
    identity: &Identity,
    gateway: &Gateway,
    name: &str,
    method: HttpMethod,
) {
    let rest_api_id = gateway.rest_api.attr("id");
    let method_name = format!("{}_{}", name, method.as_str());

    let resource = graph.add_resource(
        "aws_api_gateway_resource",
        name,
        json!({
            "rest_api_id": rest_api_id,
            "parent_id": gateway.rest_api.attr("root_resource_id"),
            "path_part": name,
        }),
    );
    graph.add_output(&format!("{}_path", name), resource.attr("path"));

    let api_method = graph.add_resource(
        "aws_api_gateway_method",
        &method_name,
        json!({
            "rest_api_id": rest_api_id,
            "resource_id": resource.attr("id"),
            "http_method": method.as_str(),
            "authorization": "NONE",
        }),
    );

    let success_response = graph.add_resource(
        "aws_api_gateway_method_response",
        &format!("{}_{}", method_name, SUCCESS_STATUS),
        json!({
            "rest_api_id": rest_api_id,
            "resource_id": resource.attr("id"),
            "http_method": api_method.attr("http_method"),
            "status_code": SUCCESS_STATUS,
            "response_models": { JSON_CONTENT_TYPE: gateway.models.success.attr("name") },
            "depends_on": [api_method.to_string()],
        }),
    );
    let error_response = graph.add_resource(
        "aws_api_gateway_method_response",
        &format!("{}_{}", method_name, ERROR_STATUS),
        json!({
            "rest_api_id": rest_api_id,
            "resource_id": resource.attr("id"),
            "http_method": api_method.attr("http_method"),
            "status_code": ERROR_STATUS,
            "response_models": { JSON_CONTENT_TYPE: gateway.models.error.attr("name") },
            "depends_on": [api_method.to_string()],
        }),
    );

    // The function is always invoked with POST, whatever the public verb is.
    let integration = graph.add_resource(
        "aws_api_gateway_integration",
        &method_name,
        json!({
            "rest_api_id": rest_api_id,
            "resource_id": resource.attr("id"),
            "http_method": api_method.attr("http_method"),
            "type": "AWS",
            "integration_http_method": "POST",
            "uri": format!(
                "arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/{}/invocations",
                identity.region,
                gateway.function.attr("arn")
            ),
            "credentials": gateway.invoke_role.attr("arn"),
            "passthrough_behavior": "WHEN_NO_TEMPLATES",
            "request_templates": { JSON_CONTENT_TYPE: REQUEST_TEMPLATE },
        }),
    );

    graph.add_resource(
        "aws_api_gateway_integration_response",
        &format!("{}_{}", method_name, SUCCESS_STATUS),
        json!({
            "rest_api_id": rest_api_id,
            "resource_id": resource.attr("id"),
            "http_method": api_method.attr("http_method"),
            "status_code": SUCCESS_STATUS,
            "response_templates": { JSON_CONTENT_TYPE: SUCCESS_RESPONSE_TEMPLATE },
            "depends_on": [success_response.to_string(), integration.to_string()],
        }),
    );
    graph.add_resource(
        "aws_api_gateway_integration_response",
        &format!("{}_{}", method_name, ERROR_STATUS),
        json!({
            "rest_api_id": rest_api_id,
            "resource_id": resource.attr("id"),
            "http_method": api_method.attr("http_method"),
            "status_code": ERROR_STATUS,
            "selection_pattern": ERROR_SELECTION_PATTERN,
            "response_templates": { JSON_CONTENT_TYPE: ERROR_RESPONSE_TEMPLATE },
            "depends_on": [error_response.to_string(), integration.to_string()],
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::{build_endpoint, build_rest_api, Gateway};
    use crate::aws::Identity;
    use crate::config::HttpMethod;
    use crate::generator::graph::{ResourceGraph, ResourceRef};
    use crate::generator::models::build_models;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn setup() -> (ResourceGraph, Identity, Gateway) {
        let identity = Identity::new("1234", "us-east-1");
        let mut graph = ResourceGraph::new("us-east-1");
        let rest_api = build_rest_api(&mut graph, &identity, "myfunc", "prod");
        let models = build_models(&mut graph, &rest_api);
        let gateway = Gateway {
            rest_api,
            function: ResourceRef::new("aws_lambda_function", "lambda_func"),
            invoke_role: ResourceRef::new("aws_iam_role", "invoke_role"),
            models,
        };
        (graph, identity, gateway)
    }

    #[test]
    fn rest_api_exposes_id_and_base_url() {
        let (graph, _, _) = setup();
        assert_eq!(
            graph.output("base_url"),
            Some("https://${aws_api_gateway_rest_api.rest_api.id}.execute-api.us-east-1.amazonaws.com/prod/")
        );
        assert_eq!(
            graph.output("rest_api_id"),
            Some("${aws_api_gateway_rest_api.rest_api.id}")
        );
    }

    #[test]
    fn declares_every_endpoint_resource() {
        let (mut graph, identity, gateway) = setup();
        build_endpoint(&mut graph, &identity, &gateway, "orders", HttpMethod::Post);

        let names = graph.qualified_names();
        for expected in [
            "aws_api_gateway_resource.orders",
            "aws_api_gateway_method.orders_POST",
            "aws_api_gateway_method_response.orders_POST_202",
            "aws_api_gateway_method_response.orders_POST_500",
            "aws_api_gateway_integration.orders_POST",
            "aws_api_gateway_integration_response.orders_POST_202",
            "aws_api_gateway_integration_response.orders_POST_500",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {}", expected);
        }
        assert_eq!(
            graph.output("orders_path"),
            Some("${aws_api_gateway_resource.orders.path}")
        );
    }

    #[test]
    fn path_resource_hangs_off_the_api_root() {
        let (mut graph, identity, gateway) = setup();
        build_endpoint(&mut graph, &identity, &gateway, "orders", HttpMethod::Get);

        let resource = graph.resource("aws_api_gateway_resource", "orders").unwrap();
        assert_eq!(
            resource,
            &json!({
                "rest_api_id": "${aws_api_gateway_rest_api.rest_api.id}",
                "parent_id": "${aws_api_gateway_rest_api.rest_api.root_resource_id}",
                "path_part": "orders",
            })
        );

        let method = graph.resource("aws_api_gateway_method", "orders_GET").unwrap();
        assert_eq!(method["http_method"], "GET");
        assert_eq!(method["authorization"], "NONE");
        assert_eq!(method["resource_id"], "${aws_api_gateway_resource.orders.id}");
    }

    #[test]
    fn integration_always_invokes_with_post() {
        let (mut graph, identity, gateway) = setup();
        build_endpoint(&mut graph, &identity, &gateway, "status", HttpMethod::Get);

        let integration = graph
            .resource("aws_api_gateway_integration", "status_GET")
            .unwrap();
        assert_eq!(integration["type"], "AWS");
        assert_eq!(integration["integration_http_method"], "POST");
        assert_eq!(integration["credentials"], "${aws_iam_role.invoke_role.arn}");
        assert_eq!(
            integration["uri"],
            "arn:aws:apigateway:us-east-1:lambda:path/2015-03-31/functions/${aws_lambda_function.lambda_func.arn}/invocations"
        );
        assert!(integration["request_templates"]["application/json"].is_string());
    }

    #[test]
    fn responses_depend_on_their_method_and_integration() {
        let (mut graph, identity, gateway) = setup();
        build_endpoint(&mut graph, &identity, &gateway, "orders", HttpMethod::Post);

        let method_response = graph
            .resource("aws_api_gateway_method_response", "orders_POST_500")
            .unwrap();
        assert_eq!(method_response["status_code"], "500");
        assert_eq!(
            method_response["response_models"]["application/json"],
            "${aws_api_gateway_model.errormessage.name}"
        );
        assert_eq!(
            method_response["depends_on"],
            json!(["aws_api_gateway_method.orders_POST"])
        );

        let success = graph
            .resource("aws_api_gateway_integration_response", "orders_POST_202")
            .unwrap();
        assert_eq!(success["status_code"], "202");
        assert!(success.get("selection_pattern").is_none());
        assert_eq!(
            success["depends_on"],
            json!([
                "aws_api_gateway_method_response.orders_POST_202",
                "aws_api_gateway_integration.orders_POST"
            ])
        );

        let error = graph
            .resource("aws_api_gateway_integration_response", "orders_POST_500")
            .unwrap();
        assert_eq!(error["status_code"], "500");
        assert!(error["selection_pattern"].as_str().unwrap().contains("Failed"));
        assert_eq!(
            error["depends_on"],
            json!([
                "aws_api_gateway_method_response.orders_POST_500",
                "aws_api_gateway_integration.orders_POST"
            ])
        );
    }
}
