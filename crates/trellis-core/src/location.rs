//! Named sources of raw request data.

use std::fmt;

/// A named source of raw request data.
///
/// Arguments declare one or more locations to pull their values from.
/// The `Values` location is the union of the query string and the form
/// body. `Custom` resolves against the snapshot's named extension
/// sources; a name with no backing source yields an empty result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// URL query string parameters.
    Args,
    /// URL-encoded form body fields.
    Form,
    /// JSON body members.
    Json,
    /// Combined query string and form body.
    Values,
    /// HTTP request headers (names are matched lowercased).
    Headers,
    /// Cookies from the `Cookie` header.
    Cookies,
    /// Uploaded files attached to the request.
    Files,
    /// Path variables extracted by the router.
    Path,
    /// A framework-defined extension source, by name.
    Custom(String),
}

impl Location {
    /// Returns the location's tag name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Args => "args",
            Self::Form => "form",
            Self::Json => "json",
            Self::Values => "values",
            Self::Headers => "headers",
            Self::Cookies => "cookies",
            Self::Files => "files",
            Self::Path => "path",
            Self::Custom(name) => name,
        }
    }

    /// Returns the human-readable description used in missing-required
    /// error messages. Unknown tags fall back to the tag name itself.
    #[must_use]
    pub fn friendly(&self) -> &str {
        match self {
            Self::Json => "the JSON body",
            Self::Form => "the post body",
            Self::Args => "the query string",
            Self::Values => "the post body or the query string",
            Self::Headers => "the HTTP headers",
            Self::Cookies => "the request's cookies",
            Self::Files => "an uploaded file",
            Self::Path => "the URL path",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names() {
        assert_eq!(Location::Args.as_str(), "args");
        assert_eq!(Location::Values.as_str(), "values");
        assert_eq!(Location::Custom("view_args".into()).as_str(), "view_args");
    }

    #[test]
    fn test_friendly_descriptions() {
        assert_eq!(Location::Args.friendly(), "the query string");
        assert_eq!(
            Location::Values.friendly(),
            "the post body or the query string"
        );
        assert_eq!(Location::Cookies.friendly(), "the request's cookies");
        assert_eq!(Location::Custom("session".into()).friendly(), "session");
    }

    #[test]
    fn test_display_matches_tag() {
        assert_eq!(Location::Headers.to_string(), "headers");
    }
}
