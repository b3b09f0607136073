use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ResourceError;

/// Separator between rendered list elements.
pub const LIST_SEPARATOR: &str = ",";

/// One declared output, normalized into a fixed set of shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    Scalar(String),
    List(Vec<String>),
    Nested(Map<String, Value>),
}

impl OutputValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(items) => OutputValue::List(items.iter().map(render_element).collect()),
            Value::Object(map) => OutputValue::Nested(map),
            scalar => OutputValue::Scalar(render_element(&scalar)),
        }
    }

    /// Flat string form written to metadata.
    ///
    /// - `Scalar`: strings verbatim, numbers and booleans as JSON text, null as "".
    /// - `List`: elements rendered like scalars (objects/arrays as compact JSON),
    ///   joined with [`LIST_SEPARATOR`].
    /// - `Nested`: compact JSON with keys sorted.
    pub fn render(&self) -> String {
        match self {
            OutputValue::Scalar(s) => s.clone(),
            OutputValue::List(items) => items.join(LIST_SEPARATOR),
            OutputValue::Nested(map) => Value::Object(map.clone()).to_string(),
        }
    }
}

fn render_element(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub value: OutputValue,
    pub sensitive: bool,
}

impl Output {
    /// Accepts both `{"value": ..., "type": ..., "sensitive": ...}` descriptors
    /// and bare values from older state formats.
    fn from_json(raw: Value) -> Self {
        match raw {
            Value::Object(mut map) if is_descriptor(&map) => {
                let sensitive = map
                    .get("sensitive")
                    .and_then(|s| s.as_bool())
                    .unwrap_or(false);
                let value = map.remove("value").unwrap_or(Value::Null);
                Output {
                    value: OutputValue::from_json(value),
                    sensitive,
                }
            }
            other => Output {
                value: OutputValue::from_json(other),
                sensitive: false,
            },
        }
    }
}

fn is_descriptor(map: &Map<String, Value>) -> bool {
    map.contains_key("value")
        && map
            .keys()
            .all(|k| matches!(k.as_str(), "value" | "type" | "sensitive"))
}

/// The parts of a Terraform state document this resource reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerraformState {
    pub format_version: Option<u64>,
    pub serial: Option<u64>,
    pub lineage: Option<String>,
    pub outputs: BTreeMap<String, Output>,
}

impl TerraformState {
    pub fn parse(bytes: &[u8]) -> Result<Self, ResourceError> {
        let document: Value = serde_json::from_slice(bytes)
            .map_err(|e| ResourceError::MalformedDocument(e.to_string()))?;

        let Value::Object(mut root) = document else {
            return Err(ResourceError::MalformedDocument(
                "state document must be a JSON object".to_string(),
            ));
        };

        let raw_outputs = match root.remove("outputs") {
            Some(outputs) => Some(outputs),
            None => root_module_outputs(&mut root),
        };

        let outputs = match raw_outputs {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(map)) => map
                .into_iter()
                .map(|(name, raw)| (name, Output::from_json(raw)))
                .collect(),
            Some(_) => {
                return Err(ResourceError::MalformedDocument(
                    "'outputs' must be a JSON object".to_string(),
                ));
            }
        };

        Ok(Self {
            format_version: root.get("version").and_then(|v| v.as_u64()),
            serial: root.get("serial").and_then(|v| v.as_u64()),
            lineage: root
                .get("lineage")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            outputs,
        })
    }
}

/// Pre-0.12 state keeps outputs under the root entry of `modules`.
fn root_module_outputs(root: &mut Map<String, Value>) -> Option<Value> {
    let modules = root.get_mut("modules")?.as_array_mut()?;
    let module = modules.iter_mut().find(|m| {
        m.get("path")
            .and_then(|p| p.as_array())
            .map(|p| p.len() == 1 && p[0] == "root")
            .unwrap_or(false)
    })?;
    module.as_object_mut()?.remove("outputs")
}
