//! Swagger-style parameter schema derivation.
//!
//! Every argument projects into one parameter-description fragment;
//! the parser collects them in declaration order. Derivation is pure:
//! calling it twice on an unchanged parser yields identical output.

use crate::argument::{Action, Argument};
use crate::convert::ArgType;
use crate::error::DeclarationError;
use crate::parser::RequestParser;
use serde_json::{Map, Value};
use trellis_core::Location;

/// Maps an argument's location onto the Swagger `in` field. Cookies
/// never reach here (cookie-located arguments emit no fragment), and
/// multi-location arguments fall back to `query`.
fn swagger_location(locations: &[Location]) -> &'static str {
    match locations {
        [single] => match single {
            Location::Args | Location::Values => "query",
            Location::Form | Location::Files => "formData",
            Location::Headers => "header",
            Location::Json => "body",
            _ => "query",
        },
        _ => "query",
    }
}

fn handle_arg_type(arg: &Argument, param: &mut Map<String, Value>) {
    match &arg.arg_type {
        ArgType::Integer => {
            param.insert("type".to_string(), Value::String("integer".to_string()));
        }
        ArgType::String => {
            param.insert("type".to_string(), Value::String("string".to_string()));
        }
        ArgType::Boolean => {
            param.insert("type".to_string(), Value::String("boolean".to_string()));
        }
        ArgType::Float | ArgType::Decimal => {
            param.insert("type".to_string(), Value::String("number".to_string()));
        }
        ArgType::Model(model) => {
            param.insert("type".to_string(), Value::String(model.name().to_string()));
            param.insert("in".to_string(), Value::String("body".to_string()));
        }
        ArgType::Custom(custom) if custom.schema().is_some() => {
            // Merged verbatim; the fragment may override any key.
            if let Some(fragment) = custom.schema() {
                for (key, value) in fragment {
                    param.insert(key.clone(), value.clone());
                }
            }
        }
        _ if arg.location == [Location::Files] => {
            param.insert("type".to_string(), Value::String("file".to_string()));
        }
        _ => {
            param.insert("type".to_string(), Value::String("string".to_string()));
        }
    }
}

fn wrap_as_array(param: &mut Map<String, Value>, collection_format: &str) {
    let base = param
        .get("type")
        .cloned()
        .unwrap_or_else(|| Value::String("string".to_string()));
    let mut items = Map::new();
    items.insert("type".to_string(), base);
    param.insert("items".to_string(), Value::Object(items));
    param.insert("type".to_string(), Value::String("array".to_string()));
    param.insert(
        "collectionFormat".to_string(),
        Value::String(collection_format.to_string()),
    );
}

impl Argument {
    /// Derives this argument's parameter-description fragment.
    ///
    /// Cookie-located arguments emit no fragment (they still parse
    /// normally at request time).
    #[must_use]
    pub fn schema_fragment(&self) -> Option<Map<String, Value>> {
        if self.location == [Location::Cookies] {
            return None;
        }

        let mut param = Map::new();
        param.insert("name".to_string(), Value::String(self.name.clone()));
        param.insert(
            "in".to_string(),
            Value::String(swagger_location(&self.location).to_string()),
        );
        handle_arg_type(self, &mut param);

        if self.required {
            param.insert("required".to_string(), Value::Bool(true));
        }
        if let Some(help) = &self.help {
            param.insert("description".to_string(), Value::String(help.clone()));
        }
        if let Some(default) = &self.default {
            let value = default.evaluate();
            if !value.is_null() {
                param.insert("default".to_string(), value);
            }
        }
        if self.action == Action::Append {
            wrap_as_array(&mut param, "multi");
        }
        if self.action == Action::Split {
            wrap_as_array(&mut param, "csv");
        }
        if !self.choices.is_empty() {
            // Enumeration formatting wins over array wrapping when both
            // apply.
            param.insert(
                "enum".to_string(),
                Value::Array(self.effective_choices().to_vec()),
            );
            param.insert(
                "collectionFormat".to_string(),
                Value::String("multi".to_string()),
            );
        }
        Some(param)
    }
}

impl RequestParser {
    /// Derives the full ordered parameter schema.
    ///
    /// Fails when the fragments would mix `body` and `formData`
    /// parameter kinds, which Swagger forbids within one operation.
    pub fn schema(&self) -> Result<Vec<Map<String, Value>>, DeclarationError> {
        let mut params = Vec::new();
        let mut has_body = false;
        let mut has_form_data = false;
        for arg in self.args.values() {
            if let Some(param) = arg.schema_fragment() {
                match param.get("in").and_then(Value::as_str) {
                    Some("body") => has_body = true,
                    Some("formData") => has_form_data = true,
                    _ => {}
                }
                params.push(param);
            }
        }
        if has_body && has_form_data {
            return Err(DeclarationError::MixedBodyAndFormData);
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{Converter, CustomType};
    use crate::model::{FieldSpec, FieldType, Model};
    use serde_json::json;

    fn as_value(param: Map<String, Value>) -> Value {
        Value::Object(param)
    }

    #[test]
    fn test_basic_fragment() {
        let arg = Argument::new("q").location(Location::Args).required(true);
        let param = arg.schema_fragment().unwrap();
        assert_eq!(
            as_value(param),
            json!({"name": "q", "in": "query", "type": "string", "required": true})
        );
    }

    #[test]
    fn test_integer_with_choices() {
        let arg = Argument::new("level")
            .location(Location::Args)
            .arg_type(ArgType::Integer)
            .choices(vec![json!(1), json!(2), json!(3)]);
        let param = arg.schema_fragment().unwrap();
        assert_eq!(
            as_value(param),
            json!({
                "name": "level",
                "in": "query",
                "type": "integer",
                "enum": [1, 2, 3],
                "collectionFormat": "multi",
            })
        );
    }

    #[test]
    fn test_default_location_maps_to_query() {
        let arg = Argument::new("level").arg_type(ArgType::Integer);
        let param = arg.schema_fragment().unwrap();
        assert_eq!(param.get("in").unwrap(), "query");
    }

    #[test]
    fn test_append_and_split_wrap_as_arrays() {
        let append = Argument::new("tags")
            .location(Location::Args)
            .action(Action::Append);
        let param = append.schema_fragment().unwrap();
        assert_eq!(param.get("type").unwrap(), "array");
        assert_eq!(param.get("items").unwrap(), &json!({"type": "string"}));
        assert_eq!(param.get("collectionFormat").unwrap(), "multi");

        let split = Argument::new("ids")
            .location(Location::Args)
            .arg_type(ArgType::Integer)
            .action(Action::Split);
        let param = split.schema_fragment().unwrap();
        assert_eq!(param.get("items").unwrap(), &json!({"type": "integer"}));
        assert_eq!(param.get("collectionFormat").unwrap(), "csv");
    }

    #[test]
    fn test_description_and_default() {
        let arg = Argument::new("limit")
            .location(Location::Args)
            .arg_type(ArgType::Integer)
            .help("Page size")
            .default_value(json!(20));
        let param = arg.schema_fragment().unwrap();
        assert_eq!(param.get("description").unwrap(), "Page size");
        assert_eq!(param.get("default").unwrap(), &json!(20));
    }

    #[test]
    fn test_lazy_default_is_evaluated() {
        let arg = Argument::new("limit")
            .location(Location::Args)
            .default_fn(|| json!(50));
        let param = arg.schema_fragment().unwrap();
        assert_eq!(param.get("default").unwrap(), &json!(50));
    }

    #[test]
    fn test_cookies_emit_no_fragment() {
        let arg = Argument::new("session").location(Location::Cookies);
        assert!(arg.schema_fragment().is_none());
    }

    #[test]
    fn test_model_forces_body() {
        let model = Model::new("Todo").field("task", FieldSpec::new(FieldType::String));
        let arg = Argument::new("todo").arg_type(ArgType::Model(model));
        let param = arg.schema_fragment().unwrap();
        assert_eq!(param.get("type").unwrap(), "Todo");
        assert_eq!(param.get("in").unwrap(), "body");
    }

    #[test]
    fn test_file_location_types_as_file() {
        let arg = Argument::new("upload")
            .location(Location::Files)
            .arg_type(ArgType::File);
        let param = arg.schema_fragment().unwrap();
        assert_eq!(param.get("type").unwrap(), "file");
        assert_eq!(param.get("in").unwrap(), "formData");
    }

    #[test]
    fn test_custom_fragment_merged_verbatim() {
        let mut fragment = Map::new();
        fragment.insert("type".to_string(), json!("string"));
        fragment.insert("format".to_string(), json!("email"));
        let custom = CustomType::new(Converter::value(crate::convert::to_string_value))
            .with_schema(fragment);

        let arg = Argument::new("email")
            .location(Location::Args)
            .arg_type(ArgType::Custom(custom));
        let param = arg.schema_fragment().unwrap();
        assert_eq!(param.get("format").unwrap(), "email");
        assert_eq!(param.get("type").unwrap(), "string");
    }

    #[test]
    fn test_parser_schema_orders_and_validates() {
        let mut parser = RequestParser::new();
        parser
            .add_argument(Argument::new("q").location(Location::Args))
            .unwrap();
        parser
            .add_argument(Argument::new("page").location(Location::Args))
            .unwrap();

        let params = parser.schema().unwrap();
        let names: Vec<_> = params
            .iter()
            .map(|p| p.get("name").and_then(Value::as_str).unwrap())
            .collect();
        assert_eq!(names, vec!["q", "page"]);
    }

    #[test]
    fn test_parser_schema_rejects_body_and_form_data() {
        let model = Model::new("Todo").field("task", FieldSpec::new(FieldType::String));
        let mut parser = RequestParser::new();
        parser
            .add_argument(Argument::new("todo").arg_type(ArgType::Model(model)))
            .unwrap();
        parser
            .add_argument(Argument::new("field").location(Location::Form))
            .unwrap();

        let err = parser.schema().unwrap_err();
        assert_eq!(err, DeclarationError::MixedBodyAndFormData);
    }

    #[test]
    fn test_schema_derivation_is_idempotent() {
        let mut parser = RequestParser::new();
        parser
            .add_argument(
                Argument::new("level")
                    .location(Location::Args)
                    .arg_type(ArgType::Integer)
                    .choices(vec![json!(1), json!(2)])
                    .action(Action::Append),
            )
            .unwrap();

        assert_eq!(parser.schema().unwrap(), parser.schema().unwrap());
    }
}
