//! Declarative argument descriptors and per-field parsing.

use crate::convert::{self, ArgType, ConversionError};
use crate::error::ParseError;
use crate::result::ParsedValue;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use trellis_core::{Location, RawValue, RequestSnapshot};

/// Delimiter for the `split` action.
const SPLIT_CHAR: char = ',';

/// Cardinality policy for a matched argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// A single scalar; the last match wins when several are present.
    #[default]
    Store,
    /// Collect every match into an ordered sequence.
    Append,
    /// Split one raw value on `,` and coerce each element.
    Split,
}

/// The value used when an argument is absent: a literal, or a producer
/// evaluated lazily at parse time.
#[derive(Clone)]
pub enum DefaultValue {
    /// A plain value.
    Literal(Value),
    /// A zero-argument producer invoked on use.
    Lazy(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Evaluates the default.
    #[must_use]
    pub fn evaluate(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Lazy(producer) => producer(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Lazy(_) => f.debug_tuple("Lazy").finish(),
        }
    }
}

/// The outcome of parsing one argument against one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A value was found and coerced.
    Found(ParsedValue),
    /// No value was found; carries the evaluated default (null when the
    /// argument declares none).
    Missing(ParsedValue),
    /// Validation failed in bundle mode; carries the error message.
    Invalid(String),
}

/// One expected input field: where to find it, how to coerce it, and
/// which validation rules apply.
///
/// # Example
///
/// ```rust
/// use trellis_params::{Argument, ArgType, ParseOutcome};
/// use trellis_core::{Location, RequestSnapshot};
///
/// let arg = Argument::new("limit")
///     .arg_type(ArgType::Integer)
///     .location(Location::Args);
///
/// let req = RequestSnapshot::builder().uri("/items?limit=25").build();
/// match arg.parse(&req, false).unwrap() {
///     ParseOutcome::Found(value) => assert_eq!(value.as_i64(), Some(25)),
///     other => panic!("unexpected outcome: {other:?}"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Argument {
    pub(crate) name: String,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) dest: Option<String>,
    pub(crate) required: bool,
    pub(crate) ignore: bool,
    pub(crate) location: Vec<Location>,
    pub(crate) arg_type: ArgType,
    pub(crate) choices: Vec<Value>,
    pub(crate) folded_choices: Vec<Value>,
    pub(crate) action: Action,
    pub(crate) operators: Vec<String>,
    pub(crate) case_sensitive: bool,
    pub(crate) store_missing: Option<bool>,
    pub(crate) trim: Option<bool>,
    pub(crate) nullable: bool,
    pub(crate) help: Option<String>,
}

impl Argument {
    /// Creates an argument with the default settings: optional, typed
    /// as string, read from the JSON body or the combined query/form
    /// values, matched with the `=` operator.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            dest: None,
            required: false,
            ignore: false,
            location: vec![Location::Json, Location::Values],
            arg_type: ArgType::default(),
            choices: Vec::new(),
            folded_choices: Vec::new(),
            action: Action::default(),
            operators: vec!["=".to_string()],
            case_sensitive: true,
            store_missing: None,
            trim: None,
            nullable: true,
            help: None,
        }
    }

    /// Returns the argument's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets a literal default value.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Literal(value));
        self
    }

    /// Sets a lazily-evaluated default.
    #[must_use]
    pub fn default_fn(mut self, producer: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(DefaultValue::Lazy(Arc::new(producer)));
        self
    }

    /// Stores the value under an alternate key in the result.
    #[must_use]
    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    /// Requires the argument to be present.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Silently skips values that fail coercion.
    #[must_use]
    pub fn ignore(mut self, ignore: bool) -> Self {
        self.ignore = ignore;
        self
    }

    /// Reads the argument from a single location.
    #[must_use]
    pub fn location(mut self, location: Location) -> Self {
        self.location = vec![location];
        self
    }

    /// Reads the argument from an ordered list of locations. An empty
    /// list leaves the current locations unchanged.
    #[must_use]
    pub fn locations(mut self, locations: Vec<Location>) -> Self {
        if !locations.is_empty() {
            self.location = locations;
        }
        self
    }

    /// Sets the coercion type.
    #[must_use]
    pub fn arg_type(mut self, arg_type: ArgType) -> Self {
        self.arg_type = arg_type;
        self
    }

    /// Restricts values to a fixed permitted set.
    #[must_use]
    pub fn choices(mut self, choices: Vec<Value>) -> Self {
        self.choices = choices;
        self.refold_choices();
        self
    }

    /// Sets the cardinality policy.
    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Sets the comparison operators matched against the source. An
    /// empty list leaves the current operators unchanged.
    #[must_use]
    pub fn operators(mut self, operators: &[&str]) -> Self {
        if !operators.is_empty() {
            self.operators = operators.iter().map(ToString::to_string).collect();
        }
        self
    }

    /// Controls case-sensitive matching of values and choices.
    #[must_use]
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self.refold_choices();
        self
    }

    /// Stores the default even when the argument is absent.
    #[must_use]
    pub fn store_missing(mut self, store_missing: bool) -> Self {
        self.store_missing = Some(store_missing);
        self
    }

    /// Strips whitespace from raw string values before coercion.
    #[must_use]
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = Some(trim);
        self
    }

    /// Controls whether an explicit null value is accepted.
    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the help text used in error messages and the schema
    /// description. A `{error_msg}` token is replaced with the
    /// underlying error text; without one, the error text is appended.
    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub(crate) fn dest_or_name(&self) -> &str {
        self.dest.as_deref().unwrap_or(&self.name)
    }

    pub(crate) fn effective_trim(&self) -> bool {
        self.trim.unwrap_or(false)
    }

    pub(crate) fn effective_store_missing(&self) -> bool {
        self.store_missing.unwrap_or(true)
    }

    pub(crate) fn effective_choices(&self) -> &[Value] {
        if self.case_sensitive {
            &self.choices
        } else {
            &self.folded_choices
        }
    }

    // The folded set is frozen here so parsing never mutates the
    // declared choices.
    fn refold_choices(&mut self) {
        self.folded_choices = self
            .choices
            .iter()
            .map(|choice| match choice {
                Value::String(s) => Value::String(s.to_lowercase()),
                other => other.clone(),
            })
            .collect();
    }

    /// Parses this argument's value(s) from the request.
    ///
    /// In bundle mode a validation failure is reported as
    /// [`ParseOutcome::Invalid`] so the caller can aggregate; otherwise
    /// it aborts with a single-error [`ParseError::Validation`].
    pub fn parse(
        &self,
        req: &RequestSnapshot,
        bundle_errors: bool,
    ) -> Result<ParseOutcome, ParseError> {
        let mut unparsed = IndexSet::new();
        self.parse_tracked(req, bundle_errors, &mut unparsed)
    }

    pub(crate) fn parse_tracked(
        &self,
        req: &RequestSnapshot,
        bundle_errors: bool,
        unparsed: &mut IndexSet<String>,
    ) -> Result<ParseOutcome, ParseError> {
        let source = req.values_for_all(&self.location);
        let mut results: Vec<ParsedValue> = Vec::new();

        for operator in &self.operators {
            let key = lookup_key(&self.name, operator);
            let Some(values) = source.get_all(&key) else {
                continue;
            };
            for raw in values {
                let mut raw = raw.clone();
                if self.effective_trim() {
                    raw = raw.trimmed();
                }
                if !self.case_sensitive {
                    raw = raw.lowercased();
                }

                let coerced = if self.action == Action::Split {
                    self.convert_split(&raw, operator)
                } else {
                    convert::convert(&self.arg_type, &raw, &self.name, operator, self.nullable)
                };
                let value = match coerced {
                    Ok(value) => value,
                    Err(error) => {
                        if self.ignore {
                            continue;
                        }
                        return self.validation_error(&error.to_string(), bundle_errors);
                    }
                };

                if !self.effective_choices().is_empty() && !self.choice_allowed(&value) {
                    let message =
                        format!("The value '{value}' is not a valid choice for '{key}'.");
                    return self.validation_error(&message, bundle_errors);
                }

                unparsed.shift_remove(&key);
                results.push(value);
            }
        }

        if results.is_empty() {
            if self.required {
                let location = self
                    .location
                    .iter()
                    .map(Location::friendly)
                    .collect::<Vec<_>>()
                    .join(" or ");
                let message = format!("Missing required parameter in {location}");
                return self.validation_error(&message, bundle_errors);
            }
            let default = self
                .default
                .as_ref()
                .map_or_else(ParsedValue::null, |d| ParsedValue::Value(d.evaluate()));
            tracing::debug!(argument = %self.name, "no value found, falling back to default");
            return Ok(ParseOutcome::Missing(default));
        }

        tracing::debug!(argument = %self.name, count = results.len(), "parsed argument values");

        if self.action == Action::Append {
            return Ok(ParseOutcome::Found(ParsedValue::List(results)));
        }
        if results.len() == 1 {
            return Ok(ParseOutcome::Found(results.swap_remove(0)));
        }
        match self.action {
            // Last match wins: later locations and operators land last
            // in the accumulated sequence.
            Action::Store => Ok(ParseOutcome::Found(results.swap_remove(results.len() - 1))),
            _ => Ok(ParseOutcome::Found(ParsedValue::List(results))),
        }
    }

    fn convert_split(
        &self,
        raw: &RawValue,
        operator: &str,
    ) -> Result<ParsedValue, ConversionError> {
        let Some(text) = raw.as_str() else {
            return Err(ConversionError::new("expected a comma-separated string"));
        };
        let mut items = Vec::new();
        for part in text.split(SPLIT_CHAR) {
            let item = convert::convert(
                &self.arg_type,
                &RawValue::Text(part.to_string()),
                &self.name,
                operator,
                self.nullable,
            )?;
            items.push(item);
        }
        Ok(ParsedValue::List(items))
    }

    fn choice_allowed(&self, value: &ParsedValue) -> bool {
        let choices = self.effective_choices();
        match value {
            ParsedValue::Value(v) => choices.contains(v),
            // Sequences are checked whole against array-shaped choices.
            ParsedValue::List(items) => {
                let mut plain = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_value() {
                        Some(v) => plain.push(v.clone()),
                        None => return false,
                    }
                }
                choices.contains(&Value::Array(plain))
            }
            ParsedValue::File(_) => false,
        }
    }

    fn validation_error(
        &self,
        error_text: &str,
        bundle_errors: bool,
    ) -> Result<ParseOutcome, ParseError> {
        let message = match &self.help {
            Some(template) if template.contains("{error_msg}") => {
                template.replace("{error_msg}", error_text)
            }
            Some(template) => format!("{template} {error_text}"),
            None => error_text.to_string(),
        };
        tracing::warn!(argument = %self.name, %message, "argument validation failed");
        if bundle_errors {
            return Ok(ParseOutcome::Invalid(message));
        }
        let mut errors = IndexMap::new();
        errors.insert(self.name.clone(), message);
        Err(ParseError::Validation { errors })
    }
}

fn lookup_key(name: &str, operator: &str) -> String {
    format!("{}{}", name, operator.replacen('=', "", 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(uri: &str) -> RequestSnapshot {
        RequestSnapshot::builder().uri(uri).build()
    }

    fn found(outcome: ParseOutcome) -> ParsedValue {
        match outcome {
            ParseOutcome::Found(value) => value,
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn test_store_takes_last_match() {
        let arg = Argument::new("tag").location(Location::Args);
        let req = query("/?tag=a&tag=b");
        let value = found(arg.parse(&req, false).unwrap());
        assert_eq!(value.as_str(), Some("b"));
    }

    #[test]
    fn test_append_collects_in_order() {
        let arg = Argument::new("tag")
            .location(Location::Args)
            .action(Action::Append);
        let req = query("/?tag=a&tag=b");
        let value = found(arg.parse(&req, false).unwrap());
        let items = value.as_list().unwrap();
        assert_eq!(items[0].as_str(), Some("a"));
        assert_eq!(items[1].as_str(), Some("b"));
    }

    #[test]
    fn test_operators_build_lookup_keys() {
        let arg = Argument::new("foo")
            .location(Location::Args)
            .operators(&[">=", "<="])
            .action(Action::Append);
        let req = query("/?foo>=bar&foo<=bat");
        let value = found(arg.parse(&req, false).unwrap());
        let items = value.as_list().unwrap();
        assert_eq!(items[0].as_str(), Some("bar"));
        assert_eq!(items[1].as_str(), Some("bat"));
    }

    #[test]
    fn test_split_action() {
        let arg = Argument::new("ids")
            .location(Location::Args)
            .arg_type(ArgType::Integer)
            .action(Action::Split);
        let req = query("/?ids=1,2,3");
        let value = found(arg.parse(&req, false).unwrap());
        let items = value.as_list().unwrap();
        assert_eq!(
            items.iter().map(|i| i.as_i64().unwrap()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_trim_and_case_folding() {
        let arg = Argument::new("name")
            .location(Location::Args)
            .trim(true)
            .case_sensitive(false);
        let req = query("/?name=%20BaT%20");
        let value = found(arg.parse(&req, false).unwrap());
        assert_eq!(value.as_str(), Some("bat"));
    }

    #[test]
    fn test_case_insensitive_choices() {
        let arg = Argument::new("foo")
            .location(Location::Args)
            .case_sensitive(false)
            .choices(vec![json!("bat")]);

        for uri in ["/?foo=BAT", "/?foo=bat"] {
            let value = found(arg.parse(&query(uri), false).unwrap());
            assert_eq!(value.as_str(), Some("bat"), "uri {uri}");
        }
        // The declared choices are untouched by parsing.
        assert_eq!(arg.choices, vec![json!("bat")]);
    }

    #[test]
    fn test_choice_violation_names_key() {
        let arg = Argument::new("foo")
            .location(Location::Args)
            .choices(vec![json!("bar")]);
        let err = arg.parse(&query("/?foo=bat"), false).unwrap_err();
        let errors = err.errors();
        assert_eq!(
            errors.get("foo").unwrap(),
            "The value 'bat' is not a valid choice for 'foo'."
        );
    }

    #[test]
    fn test_missing_required_names_locations() {
        let arg = Argument::new("foo").required(true);
        let err = arg.parse(&query("/"), false).unwrap_err();
        let errors = err.errors();
        assert_eq!(
            errors.get("foo").unwrap(),
            "Missing required parameter in the JSON body or the post body or the query string"
        );
    }

    #[test]
    fn test_missing_optional_yields_default() {
        let arg = Argument::new("limit").default_value(json!(20));
        match arg.parse(&query("/"), false).unwrap() {
            ParseOutcome::Missing(value) => assert_eq!(value.as_i64(), Some(20)),
            other => panic!("expected Missing, got {other:?}"),
        }

        let lazy = Argument::new("stamp").default_fn(|| json!("now"));
        match lazy.parse(&query("/"), false).unwrap() {
            ParseOutcome::Missing(value) => assert_eq!(value.as_str(), Some("now")),
            other => panic!("expected Missing, got {other:?}"),
        }
    }

    #[test]
    fn test_bundle_mode_returns_invalid() {
        let arg = Argument::new("n")
            .location(Location::Args)
            .arg_type(ArgType::Integer);
        match arg.parse(&query("/?n=abc"), true).unwrap() {
            ParseOutcome::Invalid(message) => assert!(message.contains("abc")),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_ignore_skips_bad_values() {
        let arg = Argument::new("n")
            .location(Location::Args)
            .arg_type(ArgType::Integer)
            .ignore(true)
            .action(Action::Append);
        let req = query("/?n=1&n=abc&n=3");
        let value = found(arg.parse(&req, false).unwrap());
        let items = value.as_list().unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_help_interpolation() {
        let arg = Argument::new("n")
            .location(Location::Args)
            .arg_type(ArgType::Integer)
            .help("Try a number ({error_msg})");
        let err = arg.parse(&query("/?n=abc"), false).unwrap_err();
        assert_eq!(
            err.errors().get("n").unwrap(),
            "Try a number ('abc' is not a valid integer)"
        );

        let appended = Argument::new("n")
            .location(Location::Args)
            .arg_type(ArgType::Integer)
            .help("Try a number.");
        let err = appended.parse(&query("/?n=abc"), false).unwrap_err();
        assert_eq!(
            err.errors().get("n").unwrap(),
            "Try a number. 'abc' is not a valid integer"
        );
    }

    #[test]
    fn test_nullable_rejects_explicit_null() {
        let arg = Argument::new("note").nullable(false);
        let req = RequestSnapshot::builder().json(&json!({"note": null})).build();
        let err = arg.parse(&req, false).unwrap_err();
        assert!(err.errors().get("note").unwrap().contains("null"));
    }

    #[test]
    fn test_dest_fallback() {
        let arg = Argument::new("public").dest("internal");
        assert_eq!(arg.dest_or_name(), "internal");
        assert_eq!(Argument::new("public").dest_or_name(), "public");
    }
}
