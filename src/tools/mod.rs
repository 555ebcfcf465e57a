pub mod convert;
pub mod fluctuation;
pub mod historical;
pub mod latest;
pub mod params;
pub mod symbols;
pub mod timeseries;

pub use convert::ConvertTool;
pub use fluctuation::FluctuationTool;
pub use historical::HistoricalRatesTool;
pub use latest::LatestRatesTool;
pub use symbols::SymbolsTool;
pub use timeseries::TimeSeriesTool;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{GatewayError, Result};

/// Standard tool request format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Result envelope returned by every tool.
///
/// Serializes as `{"success": true, ...payload}` or
/// `{"success": false, "error": "..."}`; never both, never neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ToolResponse {
    pub fn success(data: Value) -> Self {
        let mut data = match data {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        data.remove("success");
        data.remove("error");

        ToolResponse {
            success: true,
            error: None,
            data,
        }
    }

    pub fn error(message: String) -> Self {
        ToolResponse {
            success: false,
            error: Some(message),
            data: Map::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            json!({"success": false, "error": format!("Failed to encode result: {}", e)})
        })
    }

    /// Pretty JSON with two-space indentation
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_value()).unwrap_or_default()
    }
}

/// Primitive type of a tool argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
}

impl ParamType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
        }
    }
}

/// One declared tool argument
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        ParamSpec {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    pub fn optional(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        ParamSpec {
            name,
            kind,
            required: false,
            default: None,
            description,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Declared arguments of a tool, discoverable before invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentSchema {
    params: Vec<ParamSpec>,
}

impl ArgumentSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// JSON Schema object advertised through `tools/list`
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let mut property = json!({
                "type": param.kind,
                "description": param.description,
            });
            if let Some(default) = &param.default {
                property["default"] = default.clone();
            }
            properties.insert(param.name.to_string(), property);
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Checks raw arguments against the declaration.
    ///
    /// `null` arguments count as an empty object and `null` optional values
    /// count as absent; both are removed from the returned object.
    pub fn prepare(&self, arguments: Value) -> Result<Value> {
        let mut object = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(GatewayError::InvalidArgument(format!(
                    "arguments must be an object, got {}",
                    other
                )))
            }
        };

        if let Some(unknown) = object.keys().find(|key| self.get(key).is_none()) {
            return Err(GatewayError::InvalidArgument(format!(
                "unknown argument `{}`",
                unknown
            )));
        }

        object.retain(|_, value| !value.is_null());

        for param in &self.params {
            match object.get(param.name) {
                Some(value) if !param.kind.accepts(value) => {
                    return Err(GatewayError::InvalidArgument(format!(
                        "argument `{}` must be a {}",
                        param.name,
                        match param.kind {
                            ParamType::String => "string",
                            ParamType::Number => "number",
                        }
                    )))
                }
                None if param.required => {
                    return Err(GatewayError::InvalidArgument(format!(
                        "missing required argument `{}`",
                        param.name
                    )))
                }
                _ => {}
            }
        }

        Ok(Value::Object(object))
    }
}

/// MCP tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str, arguments: &ArgumentSchema) -> Self {
        ToolDefinition {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: arguments.to_json_schema(),
        }
    }
}

/// Executes one tool invocation against already-checked arguments.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> Result<Value>;
}

/// Deserialize checked arguments into a tool's request type.
pub(crate) fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| GatewayError::InvalidArgument(format!("Invalid arguments: {}", e)))
}

/// Serialize a tool's output into the success payload.
pub(crate) fn to_payload<T: Serialize>(output: &T) -> Result<Value> {
    serde_json::to_value(output)
        .map_err(|e| GatewayError::Schema(format!("Failed to encode result: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest_schema() -> ArgumentSchema {
        ArgumentSchema::new()
            .param(
                ParamSpec::optional("base_currency", ParamType::String, "Base currency")
                    .with_default("USD"),
            )
            .param(ParamSpec::optional(
                "symbols",
                ParamType::String,
                "Comma-separated currency codes",
            ))
    }

    fn convert_schema() -> ArgumentSchema {
        ArgumentSchema::new()
            .param(ParamSpec::required(
                "from_currency",
                ParamType::String,
                "Source currency",
            ))
            .param(ParamSpec::required("amount", ParamType::Number, "Amount"))
    }

    #[test]
    fn test_success_envelope_shape() {
        let response = ToolResponse::success(json!({"total_currencies": 2}));
        let value = response.to_value();
        assert_eq!(value["success"], true);
        assert_eq!(value["total_currencies"], 2);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_error_envelope_shape() {
        let response = ToolResponse::error("get_latest_rates failed: boom".to_string());
        let value = response.to_value();
        assert_eq!(
            value,
            json!({"success": false, "error": "get_latest_rates failed: boom"})
        );
    }

    #[test]
    fn test_success_payload_cannot_smuggle_error() {
        let response = ToolResponse::success(json!({"error": "x", "success": false, "n": 1}));
        let value = response.to_value();
        assert_eq!(value, json!({"success": true, "n": 1}));
    }

    #[test]
    fn test_envelope_roundtrips_through_json() {
        let response = ToolResponse::success(json!({"rates": {"EUR": 0.9}}));
        let parsed: ToolResponse = serde_json::from_str(&response.to_json_string()).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn test_json_schema_lists_required_and_defaults() {
        let schema = convert_schema().to_json_schema();
        assert_eq!(schema["required"], json!(["from_currency", "amount"]));
        assert_eq!(schema["properties"]["amount"]["type"], "number");

        let latest = latest_schema().to_json_schema();
        assert_eq!(latest["required"], json!([]));
        assert_eq!(latest["properties"]["base_currency"]["default"], "USD");
    }

    #[test]
    fn test_prepare_strips_null_optionals() {
        let prepared = latest_schema()
            .prepare(json!({"base_currency": "EUR", "symbols": null}))
            .unwrap();
        assert_eq!(prepared, json!({"base_currency": "EUR"}));
    }

    #[test]
    fn test_prepare_treats_null_as_empty() {
        assert_eq!(latest_schema().prepare(Value::Null).unwrap(), json!({}));
    }

    #[test]
    fn test_prepare_rejects_missing_required() {
        let err = convert_schema()
            .prepare(json!({"from_currency": "USD"}))
            .unwrap_err();
        assert!(err.to_string().contains("missing required argument `amount`"));
    }

    #[test]
    fn test_prepare_rejects_wrong_type() {
        let err = convert_schema()
            .prepare(json!({"from_currency": "USD", "amount": "100"}))
            .unwrap_err();
        assert!(err.to_string().contains("`amount` must be a number"));
    }

    #[test]
    fn test_prepare_rejects_unknown_argument() {
        let err = latest_schema().prepare(json!({"base": "USD"})).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument(_)));
        assert!(err.to_string().contains("`base`"));
    }

    #[test]
    fn test_prepare_rejects_non_object() {
        assert!(latest_schema().prepare(json!(["USD"])).is_err());
    }
}
