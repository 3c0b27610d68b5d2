//! Tool interface, JSON-schema types and argument validation
//!
//! Tool arguments come from a language model, so validation is strict:
//! required fields must be present, types and constraints must hold, and
//! unknown fields are rejected outright. An argument the schema does not
//! name is a hallucination, and silently ignoring it hides the bug.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of the call a tool runs on behalf of. Tools must never reach
/// outside their tenant.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub tenant_id: String,
    pub conversation_id: String,
    /// Caller address on the current channel (phone number, email).
    pub caller: String,
}

/// Tool error with JSON-RPC style error codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidParams,
            message: message.into(),
            data: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InternalError,
            message: message.into(),
            data: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::MethodNotFound,
            message: message.into(),
            data: None,
        }
    }

    pub fn timeout(tool_name: &str, timeout_secs: u64) -> Self {
        Self {
            code: ErrorCode::InternalError,
            message: format!("Tool '{}' timed out after {}s", tool_name, timeout_secs),
            data: None,
        }
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ToolError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ErrorCode {
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    Custom(i32),
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::Custom(c) => c,
        }
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = &'static str;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            -32600 => ErrorCode::InvalidRequest,
            -32601 => ErrorCode::MethodNotFound,
            -32602 => ErrorCode::InvalidParams,
            -32603 => ErrorCode::InternalError,
            c => ErrorCode::Custom(c),
        })
    }
}

/// What a tool produced. Business failures (nothing found, slot taken,
/// store unavailable) travel here with `is_error` set so the engine can
/// phrase them; only contract violations surface as `ToolError`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn json(value: impl Serialize) -> Self {
        let text = serde_json::to_string(&value).unwrap_or_default();
        Self {
            content: vec![ContentBlock::Text { text }],
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// First text block, if any. What gets folded back into the dialogue.
    pub fn first_text(&self) -> Option<String> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.clone()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
}

/// Tool schema in JSON Schema format, as advertised to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: HashMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl InputSchema {
    pub fn object() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: HashMap::new(),
            required: Vec::new(),
        }
    }

    pub fn property(mut self, name: &str, schema: PropertySchema, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub prop_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl PropertySchema {
    fn of_type(prop_type: &str, description: impl Into<String>) -> Self {
        Self {
            prop_type: prop_type.to_string(),
            description: Some(description.into()),
            enum_values: None,
            minimum: None,
            maximum: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::of_type("string", description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::of_type("number", description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::of_type("integer", description)
    }

    pub fn enum_type(description: impl Into<String>, values: Vec<String>) -> Self {
        let mut schema = Self::of_type("string", description);
        schema.enum_values = Some(values);
        schema
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.minimum = Some(min);
        self.maximum = Some(max);
        self
    }
}

/// One invocable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> ToolSchema;

    /// Run with pre-validated arguments. `Err` means a contract violation;
    /// business failures come back as `ToolOutput::error`.
    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError>;

    /// Validate arguments against the schema. Required fields must be
    /// present, constraints must hold, and fields the schema does not
    /// declare are rejected.
    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        let schema = self.schema();

        let Value::Object(obj) = args else {
            if schema.input_schema.properties.is_empty() && args.is_null() {
                return Ok(());
            }
            return Err(ToolError::invalid_params("Arguments must be an object"));
        };

        for required in &schema.input_schema.required {
            if !obj.contains_key(required) {
                return Err(ToolError::invalid_params(format!(
                    "Missing required field: {}",
                    required
                )));
            }
        }

        for (name, value) in obj {
            match schema.input_schema.properties.get(name) {
                Some(prop_schema) => validate_property(name, value, prop_schema)?,
                None => {
                    return Err(ToolError::invalid_params(format!(
                        "Unknown field: {}",
                        name
                    )));
                }
            }
        }

        Ok(())
    }

    fn timeout_secs(&self) -> u64 {
        10
    }
}

fn validate_property(name: &str, value: &Value, schema: &PropertySchema) -> Result<(), ToolError> {
    // Optional fields may arrive as explicit null.
    if value.is_null() {
        return Ok(());
    }

    let type_valid = match schema.prop_type.as_str() {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    };

    if !type_valid {
        return Err(ToolError::invalid_params(format!(
            "Field '{}' must be of type '{}', got '{}'",
            name,
            schema.prop_type,
            json_type_name(value)
        )));
    }

    if let Some(enum_values) = &schema.enum_values {
        if let Some(s) = value.as_str() {
            if !enum_values.iter().any(|v| v == s) {
                return Err(ToolError::invalid_params(format!(
                    "Field '{}' must be one of: [{}], got '{}'",
                    name,
                    enum_values.join(", "),
                    s
                )));
            }
        }
    }

    if let Some(num) = value.as_f64() {
        if let Some(min) = schema.minimum {
            if num < min {
                return Err(ToolError::invalid_params(format!(
                    "Field '{}' must be >= {}, got {}",
                    name, min, num
                )));
            }
        }
        if let Some(max) = schema.maximum {
            if num > max {
                return Err(ToolError::invalid_params(format!(
                    "Field '{}' must be <= {}, got {}",
                    name, max, num
                )));
            }
        }
    }

    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct ProbeTool;

    #[async_trait]
    impl Tool for ProbeTool {
        fn name(&self) -> &str {
            "probe"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "probe".into(),
                description: "Test tool".into(),
                input_schema: InputSchema::object()
                    .property("city", PropertySchema::string("City"), true)
                    .property(
                        "budget",
                        PropertySchema::number("Budget").with_range(0.0, 1_000_000.0),
                        false,
                    ),
            }
        }

        async fn execute(&self, _ctx: &ToolContext, _args: Value) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::text("ok"))
        }
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let err = ProbeTool.validate(&json!({"budget": 100})).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParams);
        assert!(err.message.contains("city"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ProbeTool
            .validate(&json!({"city": "Paris", "surface": 40}))
            .unwrap_err();
        assert!(err.message.contains("Unknown field: surface"));
    }

    #[test]
    fn test_type_and_range_checked() {
        assert!(ProbeTool.validate(&json!({"city": 12})).is_err());
        assert!(ProbeTool
            .validate(&json!({"city": "Paris", "budget": 2_000_000}))
            .is_err());
        assert!(ProbeTool
            .validate(&json!({"city": "Paris", "budget": 250_000}))
            .is_ok());
    }

    #[test]
    fn test_null_optional_field_allowed() {
        assert!(ProbeTool
            .validate(&json!({"city": "Paris", "budget": null}))
            .is_ok());
    }

    #[test]
    fn test_error_output_flags() {
        let output = ToolOutput::error("rien trouvé");
        assert!(output.is_error);
        assert_eq!(output.first_text().unwrap(), "rien trouvé");
    }
}
