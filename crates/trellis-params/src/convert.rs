//! Type coercion engine.
//!
//! Converts raw request values into coerced [`ParsedValue`]s. Custom
//! converters come in three fixed call shapes — value only, value plus
//! argument name, value plus name plus operator token — chosen by the
//! implementer instead of probed at runtime.

use crate::model::Model;
use crate::result::ParsedValue;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use trellis_core::RawValue;

/// A raw value failed coercion; carries the converter's message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

impl ConversionError {
    /// Creates a new conversion error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result of one coercion attempt.
pub type ConversionResult = Result<ParsedValue, ConversionError>;

type ValueFn = Arc<dyn Fn(&RawValue) -> ConversionResult + Send + Sync>;
type NamedFn = Arc<dyn Fn(&RawValue, &str) -> ConversionResult + Send + Sync>;
type OperatorFn = Arc<dyn Fn(&RawValue, &str, &str) -> ConversionResult + Send + Sync>;

/// A custom converter in one of three fixed call shapes.
///
/// Converters that format error messages want the argument name;
/// converters that implement range semantics also want the operator
/// token. Each shape is a distinct variant, so dispatch is explicit.
///
/// # Example
///
/// ```rust
/// use trellis_params::{Converter, ConversionError, ParsedValue};
/// use serde_json::json;
///
/// let positive = Converter::with_name(|raw, name| {
///     let text = raw.as_str().unwrap_or_default();
///     match text.parse::<i64>() {
///         Ok(n) if n > 0 => Ok(ParsedValue::from(json!(n))),
///         _ => Err(ConversionError::new(format!("{name} must be a positive integer"))),
///     }
/// });
///
/// let value = positive.invoke(&"3".into(), "count", "=").unwrap();
/// assert_eq!(value.as_i64(), Some(3));
/// ```
#[derive(Clone)]
pub enum Converter {
    /// `(value)` — plain converters.
    Value(ValueFn),
    /// `(value, name)` — converters that name the field in errors.
    WithName(NamedFn),
    /// `(value, name, operator)` — converters with range semantics.
    WithOperator(OperatorFn),
}

impl Converter {
    /// Creates a value-only converter.
    pub fn value(f: impl Fn(&RawValue) -> ConversionResult + Send + Sync + 'static) -> Self {
        Self::Value(Arc::new(f))
    }

    /// Creates a converter receiving the argument name.
    pub fn with_name(
        f: impl Fn(&RawValue, &str) -> ConversionResult + Send + Sync + 'static,
    ) -> Self {
        Self::WithName(Arc::new(f))
    }

    /// Creates a converter receiving the argument name and operator.
    pub fn with_operator(
        f: impl Fn(&RawValue, &str, &str) -> ConversionResult + Send + Sync + 'static,
    ) -> Self {
        Self::WithOperator(Arc::new(f))
    }

    /// Invokes the converter with its declared shape.
    pub fn invoke(&self, raw: &RawValue, name: &str, operator: &str) -> ConversionResult {
        match self {
            Self::Value(f) => f(raw),
            Self::WithName(f) => f(raw, name),
            Self::WithOperator(f) => f(raw, name, operator),
        }
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self {
            Self::Value(_) => "Value",
            Self::WithName(_) => "WithName",
            Self::WithOperator(_) => "WithOperator",
        };
        f.debug_tuple(shape).finish()
    }
}

/// A custom argument type: a converter plus an optional schema
/// fragment merged verbatim into the argument's documentation.
#[derive(Debug, Clone)]
pub struct CustomType {
    converter: Converter,
    schema: Option<serde_json::Map<String, Value>>,
}

impl CustomType {
    /// Creates a custom type from a converter.
    #[must_use]
    pub fn new(converter: Converter) -> Self {
        Self {
            converter,
            schema: None,
        }
    }

    /// Attaches a schema fragment emitted for this type.
    #[must_use]
    pub fn with_schema(mut self, schema: serde_json::Map<String, Value>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Returns the schema fragment, if any.
    #[must_use]
    pub fn schema(&self) -> Option<&serde_json::Map<String, Value>> {
        self.schema.as_ref()
    }

    pub(crate) fn converter(&self) -> &Converter {
        &self.converter
    }
}

/// The coercion unit of one argument.
#[derive(Debug, Clone, Default)]
pub enum ArgType {
    /// Strings pass through; other scalars are stringified.
    #[default]
    String,
    /// JSON integers pass through; strings parse as `i64`.
    Integer,
    /// JSON booleans pass through; `true/false/1/0` parse from strings.
    Boolean,
    /// JSON numbers pass through; strings parse as `f64`.
    Float,
    /// Arbitrary-precision numbers; parsed from the literal text, never
    /// through an intermediate float.
    Decimal,
    /// Uploaded files pass through unconverted.
    File,
    /// A nested-object schema; mapping-shaped values are marshalled
    /// against its fields.
    Model(Model),
    /// A user-supplied converter.
    Custom(CustomType),
}

/// Coerces one raw value, honoring nullability, nested models and file
/// passthrough before dispatching to the converter.
pub(crate) fn convert(
    arg_type: &ArgType,
    raw: &RawValue,
    name: &str,
    operator: &str,
    nullable: bool,
) -> ConversionResult {
    if raw.is_null() {
        if nullable {
            return Ok(ParsedValue::null());
        }
        return Err(ConversionError::new("Must not be null!"));
    }

    if let ArgType::Model(model) = arg_type {
        if let RawValue::Json(Value::Object(members)) = raw {
            return model.marshal(members).map(ParsedValue::Value);
        }
    }

    if matches!(arg_type, ArgType::File) {
        if let RawValue::File(file) = raw {
            return Ok(ParsedValue::File(file.clone()));
        }
    }

    match arg_type {
        ArgType::String => to_string_value(raw),
        ArgType::Integer => to_integer(raw),
        ArgType::Boolean => to_boolean(raw),
        ArgType::Float => to_float(raw),
        ArgType::Decimal => to_decimal(raw),
        ArgType::File => Err(ConversionError::new("expected an uploaded file")),
        ArgType::Model(_) => Err(ConversionError::new("expected a JSON object")),
        ArgType::Custom(custom) => custom.converter().invoke(raw, name, operator),
    }
}

pub(crate) fn to_string_value(raw: &RawValue) -> ConversionResult {
    match raw {
        RawValue::Text(s) => Ok(ParsedValue::Value(Value::String(s.clone()))),
        RawValue::Json(Value::String(s)) => Ok(ParsedValue::Value(Value::String(s.clone()))),
        RawValue::Json(value) => Ok(ParsedValue::Value(Value::String(value.to_string()))),
        RawValue::File(_) => Err(ConversionError::new(
            "cannot convert an uploaded file to a string",
        )),
    }
}

pub(crate) fn to_integer(raw: &RawValue) -> ConversionResult {
    match raw {
        RawValue::Json(Value::Number(n)) => n.as_i64().map_or_else(
            || Err(ConversionError::new(format!("'{n}' is not a valid integer"))),
            |i| Ok(ParsedValue::Value(Value::from(i))),
        ),
        _ => match raw.as_str() {
            Some(s) => s.parse::<i64>().map_or_else(
                |_| Err(ConversionError::new(format!("'{s}' is not a valid integer"))),
                |i| Ok(ParsedValue::Value(Value::from(i))),
            ),
            None => Err(ConversionError::new("expected an integer")),
        },
    }
}

pub(crate) fn to_boolean(raw: &RawValue) -> ConversionResult {
    match raw {
        RawValue::Json(Value::Bool(b)) => Ok(ParsedValue::Value(Value::Bool(*b))),
        _ => match raw.as_str() {
            Some(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(ParsedValue::Value(Value::Bool(true))),
                "false" | "0" => Ok(ParsedValue::Value(Value::Bool(false))),
                _ => Err(ConversionError::new(format!("'{s}' is not a valid boolean"))),
            },
            None => Err(ConversionError::new("expected a boolean")),
        },
    }
}

pub(crate) fn to_float(raw: &RawValue) -> ConversionResult {
    match raw {
        RawValue::Json(Value::Number(n)) => Ok(ParsedValue::Value(Value::Number(n.clone()))),
        _ => match raw.as_str() {
            Some(s) => s
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map_or_else(
                    || Err(ConversionError::new(format!("'{s}' is not a valid number"))),
                    |n| Ok(ParsedValue::Value(Value::Number(n))),
                ),
            None => Err(ConversionError::new("expected a number")),
        },
    }
}

pub(crate) fn to_decimal(raw: &RawValue) -> ConversionResult {
    // Stringify first so digits never pass through an f64.
    let literal = match raw {
        RawValue::Json(Value::Number(n)) => n.to_string(),
        _ => match raw.as_str() {
            Some(s) => s.to_string(),
            None => return Err(ConversionError::new("expected a decimal number")),
        },
    };
    serde_json::from_str::<serde_json::Number>(&literal).map_or_else(
        |_| {
            Err(ConversionError::new(format!(
                "'{literal}' is not a valid decimal number"
            )))
        },
        |n| Ok(ParsedValue::Value(Value::Number(n))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn text(s: &str) -> RawValue {
        RawValue::from(s)
    }

    #[test]
    fn test_null_respects_nullable() {
        let null = RawValue::Json(json!(null));
        let value = convert(&ArgType::String, &null, "f", "=", true).unwrap();
        assert!(value.is_null());

        let err = convert(&ArgType::String, &null, "f", "=", false).unwrap_err();
        assert_eq!(err.to_string(), "Must not be null!");
    }

    #[test]
    fn test_string_stringifies_scalars() {
        let value = convert(&ArgType::String, &RawValue::Json(json!(42)), "f", "=", true).unwrap();
        assert_eq!(value.as_str(), Some("42"));

        let value = convert(&ArgType::String, &text("abc"), "f", "=", true).unwrap();
        assert_eq!(value.as_str(), Some("abc"));
    }

    #[test]
    fn test_integer_from_text_and_json() {
        let value = convert(&ArgType::Integer, &text("42"), "f", "=", true).unwrap();
        assert_eq!(value.as_i64(), Some(42));

        let value =
            convert(&ArgType::Integer, &RawValue::Json(json!(7)), "f", "=", true).unwrap();
        assert_eq!(value.as_i64(), Some(7));

        let err = convert(&ArgType::Integer, &text("4.5"), "f", "=", true).unwrap_err();
        assert!(err.to_string().contains("4.5"));
    }

    #[test]
    fn test_boolean_tokens() {
        for (input, expected) in [("true", true), ("1", true), ("FALSE", false), ("0", false)] {
            let value = convert(&ArgType::Boolean, &text(input), "f", "=", true).unwrap();
            assert_eq!(value.as_bool(), Some(expected), "input {input}");
        }
        assert!(convert(&ArgType::Boolean, &text("yes"), "f", "=", true).is_err());
    }

    #[test]
    fn test_float_parses() {
        let value = convert(&ArgType::Float, &text("0.5"), "f", "=", true).unwrap();
        assert_eq!(value.as_f64(), Some(0.5));
        assert!(convert(&ArgType::Float, &text("abc"), "f", "=", true).is_err());
    }

    #[test]
    fn test_decimal_preserves_digits() {
        let value = convert(
            &ArgType::Decimal,
            &text("0.30000000000000004"),
            "f",
            "=",
            true,
        )
        .unwrap();
        let encoded = serde_json::to_string(value.as_value().unwrap()).unwrap();
        assert_eq!(encoded, "0.30000000000000004");
    }

    #[test]
    fn test_file_passthrough_only_for_files() {
        let file = trellis_core::UploadedFile::new("a.txt", None, bytes::Bytes::from_static(b"x"));
        let value = convert(&ArgType::File, &RawValue::File(file.clone()), "f", "=", true).unwrap();
        assert_eq!(value.as_file(), Some(&file));

        assert!(convert(&ArgType::File, &text("a.txt"), "f", "=", true).is_err());
    }

    #[test]
    fn test_custom_converter_shapes() {
        let value_only = Converter::value(to_integer);
        assert_eq!(
            value_only.invoke(&text("1"), "n", "=").unwrap().as_i64(),
            Some(1)
        );

        let named = Converter::with_name(|_, name| {
            Err(ConversionError::new(format!("{name} is broken")))
        });
        assert_eq!(
            named.invoke(&text("1"), "n", "=").unwrap_err().to_string(),
            "n is broken"
        );

        let ranged = Converter::with_operator(|raw, _, op| {
            let mut v = to_integer(raw)?;
            if op == "<=" {
                v = ParsedValue::from(json!(v.as_i64().unwrap_or_default() - 1));
            }
            Ok(v)
        });
        assert_eq!(
            ranged.invoke(&text("5"), "n", "<=").unwrap().as_i64(),
            Some(4)
        );
    }

    proptest! {
        #[test]
        fn prop_integer_round_trip(n in any::<i64>()) {
            let value = to_integer(&text(&n.to_string())).unwrap();
            prop_assert_eq!(value.as_i64(), Some(n));
        }

        #[test]
        fn prop_decimal_round_trips_integer_literals(n in any::<i64>()) {
            let value = to_decimal(&text(&n.to_string())).unwrap();
            let encoded = serde_json::to_string(value.as_value().unwrap()).unwrap();
            prop_assert_eq!(encoded, n.to_string());
        }
    }
}
