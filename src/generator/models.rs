use serde_json::json;

use super::graph::{ResourceGraph, ResourceRef};
use super::templates::{ERROR_MODEL_SCHEMA, SUCCESS_MODEL_SCHEMA};

const MODEL_TYPE: &str = "aws_api_gateway_model";

pub(super) struct Models {
    pub success: ResourceRef,
    pub error: ResourceRef,
}

pub(super) fn build_models(graph: &mut ResourceGraph, rest_api: &ResourceRef) -> Models {
    let success = graph.add_resource(
        MODEL_TYPE,
        "successmessage",
        json!({
            "rest_api_id": rest_api.attr("id"),
            "name": "successmessage",
            "description": "successful request response",
            "content_type": "application/json",
            "schema": SUCCESS_MODEL_SCHEMA,
        }),
    );
    let error = graph.add_resource(
        MODEL_TYPE,
        "errormessage",
        json!({
            "rest_api_id": rest_api.attr("id"),
            "name": "errormessage",
            "description": "error response",
            "content_type": "application/json",
            "schema": ERROR_MODEL_SCHEMA,
        }),
    );

    Models { success, error }
}
