use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeMap, fmt, fs, io, path::Path, str::FromStr};
use validator::{Validate, ValidationError};

pub const BASE_NAME: &str = "webhook2lambda2sqs";
pub const PROJECT_URL: &str = "https://github.com/jantman/webhook2lambda2sqs";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const FUNCTION_LOG_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Validation errors: {0}")]
    ValidationError(String),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

/// HTTP verb exposed by an endpoint. Accepted in any case, always emitted
/// upper-cased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            _ => Err(Error::ValidationError(format!(
                "unsupported HTTP method `{}`",
                s
            ))),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let method = String::deserialize(deserializer)?;
        method.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EndpointSettings {
    pub method: HttpMethod,
    pub queues: Vec<String>,
}

/// A validated endpoint: the path segment it is served under, its method
/// and the queues each request is pushed to.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub name: String,
    pub method: HttpMethod,
    pub queues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RemoteState {
    #[validate(length(min = 1))]
    pub backend: String,

    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[validate(custom = "validate_endpoints")]
    pub endpoints: BTreeMap<String, EndpointSettings>,

    pub name_suffix: Option<String>,

    #[validate(length(min = 1))]
    pub deployment_stage_name: Option<String>,

    #[validate(custom = "validate_logging_level")]
    pub logging_level: Option<String>,

    #[validate(length(min = 1))]
    pub aws_region: Option<String>,

    pub aws_tags: Option<BTreeMap<String, String>>,

    #[validate]
    pub terraform_remote_state: Option<RemoteState>,
}

impl Config {
    /// Name shared by the function, its roles and the REST API.
    pub fn resource_name(&self) -> String {
        match &self.name_suffix {
            Some(suffix) => format!("{}{}", BASE_NAME, suffix),
            None => BASE_NAME.to_string(),
        }
    }

    pub fn stage_name(&self) -> String {
        self.deployment_stage_name
            .clone()
            .unwrap_or_else(|| BASE_NAME.to_string())
    }

    pub fn function_logging_level(&self) -> String {
        self.logging_level
            .as_deref()
            .unwrap_or("info")
            .to_ascii_lowercase()
    }

    /// Endpoints sorted by name.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints
            .iter()
            .map(|(name, settings)| Endpoint {
                name: name.clone(),
                method: settings.method,
                queues: settings.queues.clone(),
            })
            .collect()
    }

    /// Every distinct queue name referenced by any endpoint, sorted.
    pub fn queue_names(&self) -> Vec<String> {
        let mut queues: Vec<String> = self
            .endpoints
            .values()
            .flat_map(|settings| settings.queues.iter().cloned())
            .collect();
        queues.sort();
        queues.dedup();
        queues
    }

    /// Tags applied to the function. `Name` may be overridden from the
    /// config file, `created_by` may not.
    pub fn tags(&self) -> BTreeMap<String, String> {
        let mut tags = self.aws_tags.clone().unwrap_or_default();
        tags.entry("Name".to_string())
            .or_insert_with(|| self.resource_name());
        tags.insert(
            "created_by".to_string(),
            format!("{} v{} <{}>", BASE_NAME, VERSION, PROJECT_URL),
        );
        tags
    }
}

/// The typed configuration together with the document it was read from.
/// The raw document travels with the generated Terraform state.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: Config,
    pub raw: serde_json::Value,
}

impl LoadedConfig {
    pub fn from_value(raw: serde_json::Value) -> Result<Self, Error> {
        let config: Config = match serde_json::from_value(raw.clone()) {
            Ok(data) => Ok(data),
            Err(error) => Err(Error::ParsingError(error.to_string())),
        }?;

        match config.validate() {
            Ok(_) => (),
            Err(error) => return Err(Error::ValidationError(error.to_string())),
        }

        return Ok(Self { config, raw });
    }
}

pub fn parse(path: &Path) -> Result<LoadedConfig, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(path.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    let is_yaml = matches!(
        path.extension().and_then(|extension| extension.to_str()),
        Some("yaml") | Some("yml")
    );
    let raw: serde_json::Value = if is_yaml {
        serde_yaml::from_str(&contents).map_err(|error| Error::ParsingError(error.to_string()))?
    } else {
        serde_json::from_str(&contents).map_err(|error| Error::ParsingError(error.to_string()))?
    };

    tracing::debug!("Loaded configuration from {}", path.display());
    LoadedConfig::from_value(raw)
}

fn validate_endpoints(
    endpoints: &BTreeMap<String, EndpointSettings>,
) -> Result<(), ValidationError> {
    if endpoints.is_empty() {
        return Err(ValidationError::new(
            "At least one endpoint has to be configured",
        ));
    }

    for (name, settings) in endpoints {
        if !is_resource_name(name) {
            return Err(ValidationError::new(
                "Endpoint names must start with a letter or underscore and contain only letters, digits, `_` or `-`",
            ));
        }
        if settings.queues.is_empty() {
            return Err(ValidationError::new(
                "Every endpoint needs at least one queue",
            ));
        }
        if settings.queues.iter().any(|queue| queue.is_empty()) {
            return Err(ValidationError::new("Queue names cannot be empty"));
        }
    }

    return Ok(());
}

fn validate_logging_level(level: &str) -> Result<(), ValidationError> {
    if !FUNCTION_LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        return Err(ValidationError::new(
            "The logging level has to be one of debug, info, warn or error",
        ));
    }

    return Ok(());
}

fn is_resource_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub fn example_config() -> serde_json::Value {
    serde_json::json!({
        "endpoints": {
            "some_resource_name": {
                "method": "POST",
                "queues": ["queueName1", "queueName2"]
            },
            "other_resource_name": {
                "method": "GET",
                "queues": ["queueName3"]
            }
        },
        "name_suffix": "-something",
        "deployment_stage_name": "webhook2lambda2sqs",
        "logging_level": "info",
        "aws_tags": {
            "Environment": "production"
        },
        "terraform_remote_state": {
            "backend": "s3",
            "config": {
                "bucket": "my-terraform-state",
                "key": "webhook2lambda2sqs.tfstate",
                "region": "us-east-1"
            }
        }
    })
}

pub const EXAMPLE_DOCS: &str = "
Configuration description:

endpoints - map describing each webhook endpoint to set up in API Gateway.
  - key is the API Gateway resource name (final component of the URL)
  - value is a map with the following keys:
    - 'method' - HTTP method for the API Gateway resource (GET or POST)
    - 'queues' - list of SQS queue names to push request content to
name_suffix - (optional) suffix appended to the base resource name
  'webhook2lambda2sqs'.
deployment_stage_name - (optional) API Gateway stage to deploy to;
  defaults to 'webhook2lambda2sqs'.
logging_level - (optional) logging level of the Lambda function; one of
  debug, info, warn or error. Defaults to info.
aws_region - (optional) region to deploy to. Defaults to the region of the
  AWS environment (AWS_REGION, shared config).
aws_tags - (optional) map of tags to apply to the Lambda function. 'Name'
  defaults to the resource name; 'created_by' is always set.
terraform_remote_state - (optional) Terraform remote state options. If
  specified, 'terraform init' is given the backend configuration before
  every terraform command.

  Keys:
  - 'backend' - name of the Terraform backend
  - 'config' - map of backend configuration option name/value pairs
";

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;

    use super::parse;
    use super::Config;
    use super::EndpointSettings;
    use super::Error;
    use super::HttpMethod;
    use super::LoadedConfig;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn minimal() -> serde_json::Value {
        json!({
            "endpoints": {
                "foo": { "method": "POST", "queues": ["q1"] }
            }
        })
    }

    #[test]
    fn file_does_not_exist() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");

        let result = parse(&file_path);
        assert_eq!(true, result.is_err());
        match result.err().unwrap() {
            Error::FileNotFound(_) => {}
            _ => panic!("Expected `FileNotFound` error"),
        }
    }

    #[test]
    fn file_wrong_format() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "Not json").unwrap();

        let result = parse(&file_path);
        assert_eq!(true, result.is_err());
        match result.err().unwrap() {
            Error::ParsingError(_) => {}
            _ => panic!("Expected `ParsingError` error"),
        }
    }

    #[test]
    fn parses_the_config() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{}", minimal()).unwrap();

        let result = parse(&file_path);
        assert_eq!(false, result.is_err());

        let loaded = result.unwrap();
        assert_eq!(loaded.raw, minimal());
        assert_eq!(loaded.config.resource_name(), "webhook2lambda2sqs");
        assert_eq!(loaded.config.stage_name(), "webhook2lambda2sqs");
    }

    #[test]
    fn parses_yaml_config() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.yml");

        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            "endpoints:\n  orders:\n    method: post\n    queues:\n      - orders\nname_suffix: -dev"
        )
        .unwrap();

        let loaded = parse(&file_path).unwrap();
        assert_eq!(loaded.config.resource_name(), "webhook2lambda2sqs-dev");
        let endpoints = loaded.config.endpoints();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].method, HttpMethod::Post);
    }

    #[test]
    fn rejects_empty_endpoints() {
        let result = LoadedConfig::from_value(json!({ "endpoints": {} }));
        match result.err().unwrap() {
            Error::ValidationError(_) => {}
            _ => panic!("Expected `ValidationError` error"),
        }
    }

    #[test]
    fn rejects_unsupported_method() {
        let result = LoadedConfig::from_value(json!({
            "endpoints": { "foo": { "method": "PUT", "queues": ["q1"] } }
        }));
        match result.err().unwrap() {
            Error::ParsingError(message) => assert!(message.contains("PUT")),
            _ => panic!("Expected `ParsingError` error"),
        }
    }

    #[test]
    fn unvalidated_config_keeps_every_endpoint() {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(
            "orders".to_string(),
            EndpointSettings {
                method: HttpMethod::Get,
                queues: vec!["q1".to_string()],
            },
        );
        endpoints.insert(
            "status".to_string(),
            EndpointSettings {
                method: HttpMethod::Post,
                queues: vec![],
            },
        );
        let config = Config {
            endpoints,
            name_suffix: None,
            deployment_stage_name: None,
            logging_level: None,
            aws_region: None,
            aws_tags: None,
            terraform_remote_state: None,
        };

        let endpoints = config.endpoints();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].method, HttpMethod::Get);
        assert_eq!(endpoints[1].name, "status");
    }

    #[test]
    fn methods_serialize_upper_cased() {
        let loaded = LoadedConfig::from_value(json!({
            "endpoints": { "foo": { "method": "get", "queues": ["q1"] } }
        }))
        .unwrap();
        let value = serde_json::to_value(&loaded.config).unwrap();
        assert_eq!(value["endpoints"]["foo"]["method"], "GET");
    }

    #[test]
    fn rejects_empty_queue_list() {
        let result = LoadedConfig::from_value(json!({
            "endpoints": { "foo": { "method": "GET", "queues": [] } }
        }));
        match result.err().unwrap() {
            Error::ValidationError(_) => {}
            _ => panic!("Expected `ValidationError` error"),
        }
    }

    #[test]
    fn rejects_invalid_endpoint_name() {
        let result = LoadedConfig::from_value(json!({
            "endpoints": { "foo/bar": { "method": "GET", "queues": ["q"] } }
        }));
        match result.err().unwrap() {
            Error::ValidationError(_) => {}
            _ => panic!("Expected `ValidationError` error"),
        }
    }

    #[test]
    fn rejects_unknown_keys() {
        let mut raw = minimal();
        raw["no_such_option"] = json!(true);
        match LoadedConfig::from_value(raw).err().unwrap() {
            Error::ParsingError(_) => {}
            _ => panic!("Expected `ParsingError` error"),
        }
    }

    #[test]
    fn rejects_unknown_logging_level() {
        let mut raw = minimal();
        raw["logging_level"] = json!("verbose");
        match LoadedConfig::from_value(raw).err().unwrap() {
            Error::ValidationError(_) => {}
            _ => panic!("Expected `ValidationError` error"),
        }
    }

    #[test]
    fn endpoints_are_sorted_with_parsed_methods() {
        let loaded = LoadedConfig::from_value(json!({
            "endpoints": {
                "zeta": { "method": "get", "queues": ["q2", "q1"] },
                "alpha": { "method": "Post", "queues": ["q1"] }
            }
        }))
        .unwrap();

        let endpoints = loaded.config.endpoints();
        assert_eq!(endpoints[0].name, "alpha");
        assert_eq!(endpoints[0].method.as_str(), "POST");
        assert_eq!(endpoints[1].name, "zeta");
        assert_eq!(endpoints[1].method.as_str(), "GET");
        assert_eq!(loaded.config.queue_names(), vec!["q1", "q2"]);
    }

    #[test]
    fn tags_keep_user_name_and_set_created_by() {
        let mut raw = minimal();
        raw["aws_tags"] = json!({ "Name": "mine", "team": "ops" });
        let loaded = LoadedConfig::from_value(raw).unwrap();

        let tags = loaded.config.tags();
        assert_eq!(tags["Name"], "mine");
        assert_eq!(tags["team"], "ops");
        assert!(tags["created_by"].starts_with("webhook2lambda2sqs v"));

        let defaults = LoadedConfig::from_value(minimal()).unwrap().config.tags();
        assert_eq!(defaults["Name"], "webhook2lambda2sqs");
    }

    #[test]
    fn example_config_is_valid() {
        let loaded = LoadedConfig::from_value(super::example_config()).unwrap();
        assert_eq!(loaded.config.endpoints().len(), 2);
        assert_eq!(
            loaded.config.terraform_remote_state.unwrap().backend,
            "s3"
        );
    }
}
