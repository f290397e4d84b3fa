//! # Trellis Params
//!
//! Declarative request-argument parsing, validation and Swagger schema
//! derivation for self-documenting HTTP APIs.
//!
//! A [`RequestParser`] holds an ordered set of [`Argument`] descriptors.
//! Each argument declares where its value comes from ([`Location`]),
//! how it is coerced ([`ArgType`]), its cardinality ([`Action`]) and
//! its validation rules. Parsing a [`RequestSnapshot`] yields a
//! [`ParseResult`]; the same declarations derive a Swagger-style
//! parameter schema at any time, with no request in hand.
//!
//! ## Example
//!
//! ```rust
//! use trellis_params::{Argument, ArgType, RequestParser};
//! use trellis_core::{Location, RequestSnapshot};
//! use serde_json::json;
//!
//! let mut parser = RequestParser::new();
//! parser
//!     .add_argument(
//!         Argument::new("q")
//!             .location(Location::Args)
//!             .required(true)
//!             .help("Search terms"),
//!     )?
//!     .add_argument(
//!         Argument::new("limit")
//!             .location(Location::Args)
//!             .arg_type(ArgType::Integer)
//!             .default_value(json!(20)),
//!     )?;
//!
//! let req = RequestSnapshot::builder().uri("/search?q=rust").build();
//! let args = parser.parse_args(&req).unwrap();
//! assert_eq!(args.get_str("q"), Some("rust"));
//! assert_eq!(args.get_i64("limit"), Some(20));
//!
//! // The same declarations document themselves.
//! let schema = parser.schema()?;
//! assert_eq!(schema.len(), 2);
//! assert_eq!(schema[0].get("name").unwrap(), "q");
//! # Ok::<(), trellis_params::DeclarationError>(())
//! ```
//!
//! ## Error handling
//!
//! Request-time failures are [`ParseError`]s carrying the per-argument
//! `errors` mapping and an HTTP 400 status; declaration-time mistakes
//! (duplicate names, body/formData schema conflicts) are
//! [`DeclarationError`]s surfaced immediately.

#![doc(html_root_url = "https://docs.rs/trellis-params/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod argument;
mod convert;
mod error;
mod model;
mod parser;
mod result;
mod schema;

pub use argument::{Action, Argument, DefaultValue, ParseOutcome};
pub use convert::{ArgType, ConversionError, ConversionResult, Converter, CustomType};
pub use error::{DeclarationError, ParseError};
pub use model::{FieldSpec, FieldType, Model};
pub use parser::{ParseOptions, RequestParser};
pub use result::{MissingFieldError, ParsedValue, ParseResult};

// Re-export the value-source types so most users need only this crate.
pub use trellis_core::{Location, MultiMap, RawValue, RequestBuilder, RequestSnapshot, UploadedFile};
