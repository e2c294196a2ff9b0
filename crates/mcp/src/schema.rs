// Declarative argument schemas: rendered as JSON Schema for listings, enforced on invocation

use crate::error::{FieldError, McpError, McpResult};
use crate::protocol::PromptArgument;
use serde_json::{Map, Value};

/// Primitive type accepted for an argument field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
}

impl FieldType {
    fn json_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
        }
    }
}

/// One named argument of a tool or prompt
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub description: String,
    pub field_type: FieldType,
    pub required: bool,
    pub default: Option<Value>,
    /// Numeric fields only: value must be > 0
    pub positive: bool,
    /// Numeric fields only: inclusive upper bound
    pub maximum: Option<i64>,
}

impl FieldSpec {
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            field_type: FieldType::String,
            required: false,
            default: None,
            positive: false,
            maximum: None,
        }
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            field_type: FieldType::Integer,
            ..Self::string(name, description)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn positive(mut self) -> Self {
        self.positive = true;
        self
    }

    pub fn at_most(mut self, maximum: i64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = match self.field_type {
            FieldType::String => json_schema_string(&self.description),
            FieldType::Integer => json_schema_integer(&self.description),
        };
        if self.positive {
            schema["exclusiveMinimum"] = Value::from(0);
        }
        if let Some(maximum) = self.maximum {
            schema["maximum"] = Value::from(maximum);
        }
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        schema
    }

    /// Check one present value, coercing numeric strings when `coerce_strings` is set.
    fn check(&self, value: &Value, coerce_strings: bool) -> Result<Value, String> {
        match self.field_type {
            FieldType::String => match value {
                Value::String(_) => Ok(value.clone()),
                other => Err(format!("expected string, got {}", type_name(other))),
            },
            FieldType::Integer => {
                let number = match value {
                    Value::Number(n) => integer_of(n),
                    Value::String(s) if coerce_strings => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                let number = number
                    .ok_or_else(|| format!("expected integer, got {}", type_name(value)))?;
                if self.positive && number <= 0 {
                    return Err(format!("must be greater than 0, got {}", number));
                }
                if let Some(maximum) = self.maximum.filter(|max| number > *max) {
                    return Err(format!("must be at most {}, got {}", maximum, number));
                }
                Ok(Value::from(number))
            }
        }
    }
}

/// Ordered set of argument fields
#[derive(Debug, Clone, Default)]
pub struct ArgumentSchema {
    fields: Vec<FieldSpec>,
}

impl ArgumentSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Render as a JSON Schema object for `tools/list`.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.to_json_schema()))
            .collect();
        let required = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        json_schema_object(Value::Object(properties), required)
    }

    /// Render as prompt argument descriptors for `prompts/list`.
    pub fn prompt_arguments(&self) -> Vec<PromptArgument> {
        self.fields
            .iter()
            .map(|f| PromptArgument {
                name: f.name.clone(),
                description: f.description.clone(),
                required: f.required,
            })
            .collect()
    }

    /// Validate tool arguments. Returns the arguments with defaults applied
    /// and undeclared keys dropped.
    pub fn validate(&self, arguments: &Value) -> McpResult<Map<String, Value>> {
        self.validate_inner(arguments, false)
    }

    /// Same as [`validate`](Self::validate) but accepts integers encoded as
    /// strings, which is how prompt arguments travel on the wire.
    pub fn validate_prompt(&self, arguments: &Value) -> McpResult<Map<String, Value>> {
        self.validate_inner(arguments, true)
    }

    fn validate_inner(
        &self,
        arguments: &Value,
        coerce_strings: bool,
    ) -> McpResult<Map<String, Value>> {
        let empty = Map::new();
        let given = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(McpError::Validation {
                    fields: vec![FieldError::new(
                        "arguments",
                        format!("expected object, got {}", type_name(other)),
                    )],
                })
            }
        };

        let mut errors = Vec::new();
        let mut validated = Map::new();

        for field in &self.fields {
            match given.get(&field.name).filter(|v| !v.is_null()) {
                Some(value) => match field.check(value, coerce_strings) {
                    Ok(value) => {
                        validated.insert(field.name.clone(), value);
                    }
                    Err(reason) => errors.push(FieldError::new(&field.name, reason)),
                },
                None if field.required => {
                    errors.push(FieldError::new(&field.name, "required field is missing"));
                }
                None => {
                    if let Some(default) = &field.default {
                        validated.insert(field.name.clone(), default.clone());
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(validated)
        } else {
            Err(McpError::Validation { fields: errors })
        }
    }
}

fn integer_of(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if integer_of(n).is_some() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> Value {
    serde_json::json!({
        "type": "string",
        "description": description
    })
}

pub fn json_schema_integer(description: &str) -> Value {
    serde_json::json!({
        "type": FieldType::Integer.json_name(),
        "description": description
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_schema() -> ArgumentSchema {
        ArgumentSchema::new()
            .field(FieldSpec::string("query", "Search keywords").required())
            .field(
                FieldSpec::integer("maxResults", "Result count")
                    .positive()
                    .with_default(1),
            )
    }

    fn offending(err: McpError) -> Vec<String> {
        match err {
            McpError::Validation { fields } => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_render_json_schema() {
        let schema = search_schema().to_json_schema();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["properties"]["maxResults"]["type"], "integer");
        assert_eq!(schema["properties"]["maxResults"]["default"], 1);
        assert_eq!(schema["properties"]["maxResults"]["exclusiveMinimum"], 0);
    }

    #[test]
    fn test_default_applied() {
        let args = search_schema().validate(&json!({"query": "apify"})).unwrap();
        assert_eq!(args["query"], "apify");
        assert_eq!(args["maxResults"], 1);
    }

    #[test]
    fn test_undeclared_keys_dropped() {
        let args = search_schema()
            .validate(&json!({"query": "apify", "extra": true}))
            .unwrap();
        assert!(!args.contains_key("extra"));
    }

    #[test]
    fn test_missing_required() {
        let err = search_schema().validate(&json!({"maxResults": 2})).unwrap_err();
        assert_eq!(offending(err), vec!["query"]);
    }

    #[test]
    fn test_null_arguments_treated_as_empty() {
        let err = search_schema().validate(&Value::Null).unwrap_err();
        assert_eq!(offending(err), vec!["query"]);
    }

    #[test]
    fn test_non_positive_rejected() {
        for bad in [json!(0), json!(-3)] {
            let err = search_schema()
                .validate(&json!({"query": "apify", "maxResults": bad}))
                .unwrap_err();
            assert_eq!(offending(err), vec!["maxResults"]);
        }
    }

    #[test]
    fn test_upper_bound_enforced() {
        let schema = ArgumentSchema::new()
            .field(FieldSpec::integer("maxResults", "Result count").positive().at_most(10));
        assert_eq!(schema.to_json_schema()["properties"]["maxResults"]["maximum"], 10);

        assert!(schema.validate(&json!({"maxResults": 10})).is_ok());
        let err = schema.validate(&json!({"maxResults": 11})).unwrap_err();
        assert_eq!(offending(err), vec!["maxResults"]);
    }

    #[test]
    fn test_wrong_types_all_reported() {
        let err = search_schema()
            .validate(&json!({"query": 42, "maxResults": "two"}))
            .unwrap_err();
        assert_eq!(offending(err), vec!["query", "maxResults"]);
    }

    #[test]
    fn test_fractional_number_rejected() {
        let err = search_schema()
            .validate(&json!({"query": "apify", "maxResults": 1.5}))
            .unwrap_err();
        assert_eq!(offending(err), vec!["maxResults"]);

        let args = search_schema()
            .validate(&json!({"query": "apify", "maxResults": 3.0}))
            .unwrap();
        assert_eq!(args["maxResults"], 3);
    }

    #[test]
    fn test_non_object_arguments() {
        let err = search_schema().validate(&json!(["apify"])).unwrap_err();
        assert_eq!(offending(err), vec!["arguments"]);
    }

    #[test]
    fn test_prompt_coerces_numeric_strings() {
        let args = search_schema()
            .validate_prompt(&json!({"query": "apify", "maxResults": "3"}))
            .unwrap();
        assert_eq!(args["maxResults"], 3);

        let err = search_schema()
            .validate_prompt(&json!({"query": "apify", "maxResults": "0"}))
            .unwrap_err();
        assert_eq!(offending(err), vec!["maxResults"]);
    }

    #[test]
    fn test_prompt_arguments() {
        let args = search_schema().prompt_arguments();
        assert_eq!(args.len(), 2);
        assert!(args[0].required);
        assert!(!args[1].required);
    }
}
