//! Error types for argument declaration and request parsing.
//!
//! Declaration-time failures (duplicate names, schema conflicts) are
//! programmer errors surfaced immediately as [`DeclarationError`].
//! Request-time failures carry the per-argument error mapping and map
//! to an HTTP 400 response.

use http::StatusCode;
use indexmap::IndexMap;
use thiserror::Error;

/// Errors raised while declaring arguments or deriving a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// An argument with the same name is already registered.
    #[error("can't add duplicate argument '{0}' to parser")]
    DuplicateArgument(String),

    /// The named argument is not registered.
    #[error("argument '{0}' does not exist")]
    UnknownArgument(String),

    /// The derived schema would mix body and formData parameters.
    #[error("can't use formData and body parameters at the same time")]
    MixedBodyAndFormData,
}

/// Errors raised while parsing a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// One or more arguments failed validation.
    #[error("Input payload validation failed")]
    Validation {
        /// Per-argument error messages, keyed by argument name.
        errors: IndexMap<String, String>,
    },

    /// Strict mode found keys not claimed by any declared argument.
    #[error("Unknown arguments: {}", .keys.join(", "))]
    UnknownArguments {
        /// The unclaimed keys, in source order.
        keys: Vec<String>,
    },
}

impl ParseError {
    /// Returns the HTTP status code for this failure.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Returns the per-argument error mapping, empty for strict-mode
    /// failures.
    #[must_use]
    pub fn errors(&self) -> IndexMap<String, String> {
        match self {
            Self::Validation { errors } => errors.clone(),
            Self::UnknownArguments { .. } => IndexMap::new(),
        }
    }

    /// Renders the failure as a JSON response body with a top-level
    /// `message` and, for validation failures, an `errors` mapping.
    #[must_use]
    pub fn json_body(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert(
            "message".to_string(),
            serde_json::Value::String(self.to_string()),
        );
        if let Self::Validation { errors } = self {
            let errors: serde_json::Map<String, serde_json::Value> = errors
                .iter()
                .map(|(name, message)| (name.clone(), serde_json::Value::String(message.clone())))
                .collect();
            body.insert("errors".to_string(), serde_json::Value::Object(errors));
        }
        serde_json::Value::Object(body)
    }
}
