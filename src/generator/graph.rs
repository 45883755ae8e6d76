use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{json, Map, Value};
use std::{collections::BTreeMap, fmt};
use tracing::warn;

/// A `(type, name)` pair identifying one declared resource. Displays as
/// `type.name`, the form Terraform expects in `depends_on`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResourceRef {
    kind: String,
    name: String,
}

impl ResourceRef {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Interpolation string for one attribute, e.g. `${aws_iam_role.lambda_role.arn}`.
    pub fn attr(&self, attribute: &str) -> String {
        format!("${{{}.{}.{}}}", self.kind, self.name, attribute)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// The infrastructure description under construction. Builders add to it in
/// a fixed order; nothing is ever removed during a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceGraph {
    provider: BTreeMap<String, Value>,
    resources: BTreeMap<String, BTreeMap<String, Value>>,
    outputs: BTreeMap<String, String>,
    backend: Option<String>,
}

impl ResourceGraph {
    pub fn new(region: &str) -> Self {
        let mut provider = BTreeMap::new();
        provider.insert("aws".to_string(), json!({ "region": region }));

        Self {
            provider,
            ..Default::default()
        }
    }

    pub fn set_backend(&mut self, backend: &str) {
        self.backend = Some(backend.to_string());
    }

    pub fn add_resource(&mut self, kind: &str, name: &str, attributes: Value) -> ResourceRef {
        let previous = self
            .resources
            .entry(kind.to_string())
            .or_default()
            .insert(name.to_string(), attributes);
        if previous.is_some() {
            warn!("Resource {}.{} declared twice; keeping the last declaration", kind, name);
        }

        ResourceRef::new(kind, name)
    }

    pub fn add_output(&mut self, name: &str, value: impl Into<String>) {
        self.outputs.insert(name.to_string(), value.into());
    }

    pub fn resource(&self, kind: &str, name: &str) -> Option<&Value> {
        self.resources.get(kind)?.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&str> {
        self.outputs.get(name).map(String::as_str)
    }

    /// Every declared resource as `type.name`, sorted by type then name.
    pub fn qualified_names(&self) -> Vec<String> {
        self.resources
            .iter()
            .flat_map(|(kind, named)| {
                named
                    .keys()
                    .map(move |name| ResourceRef::new(kind.as_str(), name.as_str()).to_string())
            })
            .collect()
    }

    pub fn resources_value(&self) -> Value {
        Value::Object(
            self.resources
                .iter()
                .map(|(kind, named)| {
                    let named: Map<String, Value> = named
                        .iter()
                        .map(|(name, attributes)| (name.clone(), attributes.clone()))
                        .collect();
                    (kind.clone(), Value::Object(named))
                })
                .collect(),
        )
    }

    pub fn to_value(&self) -> Value {
        let mut document = Map::new();
        document.insert(
            "provider".to_string(),
            Value::Object(
                self.provider
                    .iter()
                    .map(|(name, settings)| (name.clone(), settings.clone()))
                    .collect(),
            ),
        );
        document.insert("resource".to_string(), self.resources_value());
        document.insert(
            "output".to_string(),
            Value::Object(
                self.outputs
                    .iter()
                    .map(|(name, value)| (name.clone(), json!({ "value": value })))
                    .collect(),
            ),
        );
        if let Some(backend) = &self.backend {
            let mut backends = Map::new();
            backends.insert(backend.clone(), json!({}));
            document.insert("terraform".to_string(), json!({ "backend": backends }));
        }

        Value::Object(document)
    }

    /// Only the deployment builder may seal a graph, which keeps it the last
    /// step of every run.
    pub(super) fn seal(self) -> TerraformConfig {
        TerraformConfig { graph: self }
    }
}

/// A finished, read-only Terraform configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TerraformConfig {
    graph: ResourceGraph,
}

impl TerraformConfig {
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Pretty JSON with sorted keys, 4-space indentation and a trailing
    /// newline. Identical graphs always render to identical bytes.
    pub fn render(&self) -> String {
        let mut rendered = to_canonical_string_pretty(&self.graph.to_value());
        rendered.push('\n');
        rendered
    }
}

/// Serializes objects with their keys sorted, whatever map type
/// `serde_json` was built with.
struct Canonical<'a>(&'a Value);

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&Canonical(item))?;
                }
                seq.end()
            }
            Value::Object(object) => {
                let mut entries: Vec<(&String, &Value)> = object.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, &Canonical(value))?;
                }
                map.end()
            }
            other => other.serialize(serializer),
        }
    }
}

/// Compact JSON with sorted keys, used for policy documents and anything
/// else embedded as text.
pub fn to_canonical_string(value: &Value) -> String {
    serde_json::to_string(&Canonical(value)).unwrap_or_else(|_| value.to_string())
}

pub fn to_canonical_string_pretty(value: &Value) -> String {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    match Canonical(value).serialize(&mut serializer) {
        Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
        Err(_) => value.to_string(),
    }
}
