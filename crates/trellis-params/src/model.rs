//! Nested-object models.
//!
//! A [`Model`] is a named, ordered field schema. Arguments typed with a
//! model marshal mapping-shaped raw values into structured objects, and
//! the model contributes its registered name to the derived schema.

use crate::convert::{self, ConversionError};
use indexmap::IndexMap;
use serde_json::Value;
use trellis_core::RawValue;

/// The shape of one model field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// A string field.
    String,
    /// An integer field.
    Integer,
    /// A boolean field.
    Boolean,
    /// A float field.
    Float,
    /// Any JSON value, passed through unchanged.
    Raw,
    /// A nested model.
    Nested(Model),
}

/// One declared model field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    field_type: FieldType,
    required: bool,
    default: Option<Value>,
}

impl FieldSpec {
    /// Creates an optional field of the given type.
    #[must_use]
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the value used when the field is absent.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A named, ordered field schema for nested-object arguments.
///
/// # Example
///
/// ```rust
/// use trellis_params::{FieldSpec, FieldType, Model};
/// use serde_json::json;
///
/// let todo = Model::new("Todo")
///     .field("task", FieldSpec::new(FieldType::String).required())
///     .field("done", FieldSpec::new(FieldType::Boolean).with_default(json!(false)));
///
/// let input = json!({"task": "write docs", "extra": "dropped"});
/// let output = todo.marshal(input.as_object().unwrap()).unwrap();
/// assert_eq!(output, json!({"task": "write docs", "done": false}));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    name: String,
    fields: IndexMap<String, FieldSpec>,
}

impl Model {
    /// Creates an empty model with a registered name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Adds a field to the model.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Returns the model's registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Projects a JSON object through the model's fields: declared
    /// fields are coerced, absent fields take their default (or fail
    /// when required), undeclared members are dropped.
    pub fn marshal(
        &self,
        members: &serde_json::Map<String, Value>,
    ) -> Result<Value, ConversionError> {
        let mut output = serde_json::Map::with_capacity(self.fields.len());
        for (name, spec) in &self.fields {
            let value = match members.get(name) {
                Some(value) => Self::marshal_field(name, spec, value)?,
                None if spec.required => {
                    return Err(ConversionError::new(format!(
                        "missing required field '{name}'"
                    )))
                }
                None => spec.default.clone().unwrap_or(Value::Null),
            };
            output.insert(name.clone(), value);
        }
        Ok(Value::Object(output))
    }

    fn marshal_field(
        name: &str,
        spec: &FieldSpec,
        value: &Value,
    ) -> Result<Value, ConversionError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let raw = RawValue::Json(value.clone());
        let coerced = match &spec.field_type {
            FieldType::String => convert::to_string_value(&raw),
            FieldType::Integer => convert::to_integer(&raw),
            FieldType::Boolean => convert::to_boolean(&raw),
            FieldType::Float => convert::to_float(&raw),
            FieldType::Raw => return Ok(value.clone()),
            FieldType::Nested(model) => {
                return match value.as_object() {
                    Some(members) => model.marshal(members),
                    None => Err(ConversionError::new(format!(
                        "field '{name}' expected a JSON object"
                    ))),
                }
            }
        };
        coerced
            .map_err(|e| ConversionError::new(format!("field '{name}': {e}")))
            .map(|parsed| parsed.as_value().cloned().unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> Model {
        Model::new("Person")
            .field("name", FieldSpec::new(FieldType::String).required())
            .field("age", FieldSpec::new(FieldType::Integer))
    }

    #[test]
    fn test_marshal_projects_declared_fields() {
        let input = json!({"name": "alice", "age": "30", "role": "admin"});
        let output = person().marshal(input.as_object().unwrap()).unwrap();
        assert_eq!(output, json!({"name": "alice", "age": 30}));
    }

    #[test]
    fn test_marshal_missing_required_fails() {
        let input = json!({"age": 30});
        let err = person().marshal(input.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_marshal_applies_defaults() {
        let model = Model::new("Prefs")
            .field("theme", FieldSpec::new(FieldType::String).with_default(json!("light")));
        let output = model.marshal(json!({}).as_object().unwrap()).unwrap();
        assert_eq!(output, json!({"theme": "light"}));
    }

    #[test]
    fn test_marshal_nested_model() {
        let address = Model::new("Address")
            .field("city", FieldSpec::new(FieldType::String).required());
        let model = Model::new("Person")
            .field("address", FieldSpec::new(FieldType::Nested(address)));

        let input = json!({"address": {"city": "Oslo", "zip": "0150"}});
        let output = model.marshal(input.as_object().unwrap()).unwrap();
        assert_eq!(output, json!({"address": {"city": "Oslo"}}));

        let input = json!({"address": "Oslo"});
        let err = model.marshal(input.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("address"));
    }

    #[test]
    fn test_marshal_coercion_error_names_field() {
        let input = json!({"name": "alice", "age": "abc"});
        let err = person().marshal(input.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("age"));
        assert!(err.to_string().contains("abc"));
    }
}
