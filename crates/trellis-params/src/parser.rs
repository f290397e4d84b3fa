//! Ordered collections of arguments parsed against one request.

use crate::argument::{Argument, ParseOutcome};
use crate::error::{DeclarationError, ParseError};
use crate::result::ParseResult;
use indexmap::{IndexMap, IndexSet};
use trellis_core::{Location, RequestSnapshot};

/// Per-call parse settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reject keys not claimed by any declared argument.
    pub strict: bool,
    /// Aggregate all validation failures instead of stopping at the
    /// first. Combined with the parser's own flag by logical OR.
    pub bundle_errors: bool,
}

/// An ordered, uniquely-named collection of [`Argument`]s.
///
/// Parsers are built once at route-registration time and reused for
/// every request; parsing never mutates them.
///
/// # Example
///
/// ```rust
/// use trellis_params::{Argument, ArgType, RequestParser};
/// use trellis_core::{Location, RequestSnapshot};
///
/// let mut parser = RequestParser::new();
/// parser
///     .add_argument(Argument::new("q").location(Location::Args).required(true))?
///     .add_argument(Argument::new("limit").location(Location::Args).arg_type(ArgType::Integer))?;
///
/// let req = RequestSnapshot::builder().uri("/search?q=rust&limit=10").build();
/// let args = parser.parse_args(&req).unwrap();
/// assert_eq!(args.get_str("q"), Some("rust"));
/// assert_eq!(args.get_i64("limit"), Some(10));
/// # Ok::<(), trellis_params::DeclarationError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RequestParser {
    pub(crate) args: IndexMap<String, Argument>,
    trim: bool,
    store_missing: bool,
    bundle_errors: bool,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self {
            args: IndexMap::new(),
            trim: false,
            store_missing: true,
            bundle_errors: false,
        }
    }
}

impl RequestParser {
    /// Creates an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables whitespace trimming for all arguments added afterwards
    /// that do not set their own flag.
    #[must_use]
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Controls whether absent arguments store their default, for all
    /// arguments added afterwards that do not set their own flag.
    #[must_use]
    pub fn store_missing(mut self, store_missing: bool) -> Self {
        self.store_missing = store_missing;
        self
    }

    /// Aggregates validation failures across arguments instead of
    /// stopping at the first.
    #[must_use]
    pub fn bundle_errors(mut self, bundle_errors: bool) -> Self {
        self.bundle_errors = bundle_errors;
        self
    }

    /// Registers an argument. Duplicate names are rejected.
    pub fn add_argument(&mut self, mut arg: Argument) -> Result<&mut Self, DeclarationError> {
        if self.args.contains_key(arg.name()) {
            return Err(DeclarationError::DuplicateArgument(arg.name().to_string()));
        }
        self.init_argument(&mut arg);
        self.args.insert(arg.name().to_string(), arg);
        Ok(self)
    }

    /// Re-declares the argument with the same name.
    pub fn replace_argument(&mut self, mut arg: Argument) -> Result<&mut Self, DeclarationError> {
        if !self.args.contains_key(arg.name()) {
            return Err(DeclarationError::UnknownArgument(arg.name().to_string()));
        }
        self.init_argument(&mut arg);
        self.args.insert(arg.name().to_string(), arg);
        Ok(self)
    }

    /// Removes the named argument.
    pub fn remove_argument(&mut self, name: &str) -> Result<&mut Self, DeclarationError> {
        if self.args.shift_remove(name).is_none() {
            return Err(DeclarationError::UnknownArgument(name.to_string()));
        }
        Ok(self)
    }

    /// Returns the named argument, if registered.
    #[must_use]
    pub fn get_argument(&self, name: &str) -> Option<&Argument> {
        self.args.get(name)
    }

    /// Returns the registered arguments in insertion order.
    pub fn arguments(&self) -> impl Iterator<Item = &Argument> {
        self.args.values()
    }

    /// Returns the number of registered arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns true if no arguments are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Creates an independent copy of this parser: mutating the copy's
    /// arguments never affects the original.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Parses all arguments from the request with default options.
    pub fn parse_args(&self, req: &RequestSnapshot) -> Result<ParseResult, ParseError> {
        self.parse_args_with(req, ParseOptions::default())
    }

    /// Parses all arguments from the request.
    pub fn parse_args_with(
        &self,
        req: &RequestSnapshot,
        options: ParseOptions,
    ) -> Result<ParseResult, ParseError> {
        let bundle_errors = self.bundle_errors || options.bundle_errors;
        tracing::debug!(
            arguments = self.args.len(),
            strict = options.strict,
            "parsing request arguments"
        );

        // Keys not yet claimed by any argument; strict mode fails when
        // any survive the full pass.
        let mut unparsed: IndexSet<String> = if options.strict {
            req.values_for_all(&self.tracked_locations())
                .keys()
                .map(String::from)
                .collect()
        } else {
            IndexSet::new()
        };

        let mut result = ParseResult::new();
        let mut errors: IndexMap<String, String> = IndexMap::new();
        for arg in self.args.values() {
            match arg.parse_tracked(req, bundle_errors, &mut unparsed)? {
                ParseOutcome::Invalid(message) => {
                    errors.insert(arg.name().to_string(), message);
                }
                ParseOutcome::Found(value) => result.insert(arg.dest_or_name(), value),
                ParseOutcome::Missing(default) => {
                    if arg.effective_store_missing() {
                        result.insert(arg.dest_or_name(), default);
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(ParseError::Validation { errors });
        }
        if options.strict && !unparsed.is_empty() {
            return Err(ParseError::UnknownArguments {
                keys: unparsed.into_iter().collect(),
            });
        }
        Ok(result)
    }

    fn init_argument(&self, arg: &mut Argument) {
        if arg.trim.is_none() {
            arg.trim = Some(self.trim);
        }
        if arg.store_missing.is_none() {
            arg.store_missing = Some(self.store_missing);
        }
    }

    fn tracked_locations(&self) -> Vec<Location> {
        let mut locations = vec![Location::Json, Location::Values];
        for arg in self.args.values() {
            for location in &arg.location {
                if !locations.contains(location) {
                    locations.push(location.clone());
                }
            }
        }
        locations
    }
}
