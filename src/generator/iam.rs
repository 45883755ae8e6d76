use serde_json::{json, Value};
use std::collections::BTreeSet;

use super::graph::{to_canonical_string, ResourceGraph, ResourceRef};
use crate::aws::Identity;
use crate::config::Endpoint;

const ROLE_TYPE: &str = "aws_iam_role";
const ROLE_POLICY_TYPE: &str = "aws_iam_role_policy";

pub(super) struct Roles {
    /// Assumed by the function.
    pub execution: ResourceRef,
    /// Assumed by API Gateway to invoke the function.
    pub invocation: ResourceRef,
}

pub(super) fn build_roles(
    graph: &mut ResourceGraph,
    identity: &Identity,
    resource_name: &str,
    endpoints: &[Endpoint],
) -> Roles {
    let execution = graph.add_resource(
        ROLE_TYPE,
        "lambda_role",
        json!({
            "name": resource_name,
            "assume_role_policy": assume_role_policy("lambda.amazonaws.com"),
        }),
    );
    graph.add_resource(
        ROLE_POLICY_TYPE,
        "lambda_role_policy",
        json!({
            "name": resource_name,
            "role": execution.attr("id"),
            "policy": to_canonical_string(&execution_policy(identity, resource_name, endpoints)),
        }),
    );
    graph.add_output("iam_role_arn", execution.attr("arn"));
    graph.add_output("iam_role_unique_id", execution.attr("unique_id"));

    let invoke_name = format!("{}-invoke", resource_name);
    let invocation = graph.add_resource(
        ROLE_TYPE,
        "invoke_role",
        json!({
            "name": invoke_name,
            "assume_role_policy": assume_role_policy("apigateway.amazonaws.com"),
        }),
    );
    graph.add_resource(
        ROLE_POLICY_TYPE,
        "invoke_policy",
        json!({
            "name": invoke_name,
            "role": invocation.attr("id"),
            "policy": to_canonical_string(&invoke_policy()),
        }),
    );

    Roles {
        execution,
        invocation,
    }
}

fn assume_role_policy(service: &str) -> String {
    to_canonical_string(&json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Action": "sts:AssumeRole",
                "Principal": { "Service": service },
                "Effect": "Allow",
                "Sid": ""
            }
        ]
    }))
}

fn execution_policy(identity: &Identity, resource_name: &str, endpoints: &[Endpoint]) -> Value {
    let log_group = format!("log-group:/aws/lambda/{}:*", resource_name);

    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Action": "logs:CreateLogGroup",
                "Resource": identity.arn("logs", "*")
            },
            {
                "Effect": "Allow",
                "Action": ["logs:CreateLogStream", "logs:PutLogEvents"],
                "Resource": [identity.arn("logs", &log_group)]
            },
            {
                "Effect": "Allow",
                "Action": ["sqs:ListQueues"],
                "Resource": identity.arn("sqs", "*")
            },
            {
                "Effect": "Allow",
                "Action": ["sqs:GetQueueUrl", "sqs:SendMessage"],
                "Resource": queue_arns(identity, endpoints)
            }
        ]
    })
}

fn invoke_policy() -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Action": ["lambda:InvokeFunction"],
                "Resource": ["*"]
            }
        ]
    })
}

/// ARNs of every queue any endpoint writes to, each once, sorted.
fn queue_arns(identity: &Identity, endpoints: &[Endpoint]) -> Vec<String> {
    endpoints
        .iter()
        .flat_map(|endpoint| endpoint.queues.iter())
        .map(|queue| identity.arn("sqs", queue))
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}
