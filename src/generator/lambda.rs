use serde_json::json;
use std::collections::BTreeMap;

use super::graph::{ResourceGraph, ResourceRef};
use crate::config::{PROJECT_URL, VERSION};
use crate::function::{FUNCTION_HANDLER, FUNCTION_RUNTIME, FUNCTION_ZIP_FILE};

const FUNCTION_TIMEOUT_SECONDS: u32 = 120;

pub(super) fn build_function(
    graph: &mut ResourceGraph,
    resource_name: &str,
    execution_role: &ResourceRef,
    tags: &BTreeMap<String, String>,
) -> ResourceRef {
    let function = graph.add_resource(
        "aws_lambda_function",
        "lambda_func",
        json!({
            "filename": FUNCTION_ZIP_FILE,
            "function_name": resource_name,
            "role": execution_role.attr("arn"),
            "handler": FUNCTION_HANDLER,
            "source_code_hash": format!("${{filebase64sha256(\"{}\")}}", FUNCTION_ZIP_FILE),
            "description": format!(
                "push webhook contents to SQS - generated and managed by {} v{}",
                PROJECT_URL, VERSION
            ),
            "runtime": FUNCTION_RUNTIME,
            "timeout": FUNCTION_TIMEOUT_SECONDS,
            "tags": tags,
        }),
    );
    graph.add_output("lambda_func_arn", function.attr("arn"));

    function
}

#[cfg(test)]
mod tests {
    use super::build_function;
    use crate::generator::graph::{ResourceGraph, ResourceRef};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn function_uses_the_execution_role_and_zip() {
        let mut graph = ResourceGraph::new("us-east-1");
        let role = ResourceRef::new("aws_iam_role", "lambda_role");
        let mut tags = BTreeMap::new();
        tags.insert("Name".to_string(), "myfunc".to_string());

        let function = build_function(&mut graph, "myfunc", &role, &tags);
        assert_eq!(function.to_string(), "aws_lambda_function.lambda_func");

        let attributes = graph.resource("aws_lambda_function", "lambda_func").unwrap();
        assert_eq!(attributes["function_name"], "myfunc");
        assert_eq!(attributes["role"], "${aws_iam_role.lambda_role.arn}");
        assert_eq!(
            attributes["source_code_hash"],
            "${filebase64sha256(\"webhook2lambda2sqs_func.zip\")}"
        );
        assert_eq!(attributes["timeout"], 120);
        assert_eq!(attributes["tags"], json!({ "Name": "myfunc" }));
        assert_eq!(
            graph.output("lambda_func_arn"),
            Some("${aws_lambda_function.lambda_func.arn}")
        );
    }
}
