use serde_json::{json, Map, Value};

use crate::config::Config;

pub const FUNCTION_SOURCE_FILE: &str = "webhook2lambda2sqs_func.js";
pub const FUNCTION_ZIP_FILE: &str = "webhook2lambda2sqs_func.zip";
pub const FUNCTION_HANDLER: &str = "webhook2lambda2sqs_func.handler";
pub const FUNCTION_RUNTIME: &str = "nodejs18.x";

const TEMPLATE: &str = include_str!("templates/webhook2lambda2sqs_func.js");

/// Renders the function body with the endpoint table and logging level
/// baked in.
pub fn generate(config: &Config) -> String {
    let endpoints: Map<String, Value> = config
        .endpoints()
        .into_iter()
        .map(|endpoint| {
            (
                endpoint.name,
                json!({
                    "method": endpoint.method.as_str(),
                    "queues": endpoint.queues,
                }),
            )
        })
        .collect();
    let endpoints = serde_json::to_string_pretty(&Value::Object(endpoints))
        .unwrap_or_else(|_| String::from("{}"));
    let logging_level = Value::String(config.function_logging_level()).to_string();

    tracing::debug!("Generating function source for {} endpoints", config.endpoints.len());
    // Endpoint names and queues are user text, so they go in last and are
    // never scanned for placeholders.
    TEMPLATE
        .replace("__LOGGING_LEVEL__", &logging_level)
        .replace("__ENDPOINTS__", &endpoints)
}
