//! Request snapshot and value source resolution.
//!
//! A [`RequestSnapshot`] is an immutable view of one HTTP request with
//! the body already buffered by the enclosing server. Body-backed
//! locations (form, JSON) are materialized on demand from the buffered
//! bytes; resolving a location never fails, an absent or unreadable
//! source simply yields an empty map.

use crate::location::Location;
use crate::multimap::MultiMap;
use crate::value::{RawValue, UploadedFile};
use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use indexmap::IndexMap;

/// An immutable snapshot of one HTTP request, used as the value source
/// for argument parsing.
///
/// # Example
///
/// ```rust
/// use trellis_core::{Location, RequestSnapshot};
///
/// let req = RequestSnapshot::builder()
///     .uri("/search?q=rust&limit=10")
///     .build();
///
/// let args = req.values_for(&Location::Args);
/// assert_eq!(args.get("q").unwrap().as_str(), Some("rust"));
/// assert_eq!(args.get("limit").unwrap().as_str(), Some("10"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: Vec<(String, String)>,
    files: Vec<(String, UploadedFile)>,
    extensions: IndexMap<String, MultiMap>,
}

impl RequestSnapshot {
    /// Returns a builder for constructing a snapshot.
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the buffered request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns a header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Resolves a single location into a multi-valued map of raw values.
    #[must_use]
    pub fn values_for(&self, location: &Location) -> MultiMap {
        match location {
            Location::Args => self.query_values(),
            Location::Form => self.form_values(),
            Location::Json => self.json_values(),
            Location::Values => {
                // Query string first, form body on top.
                let mut map = self.query_values();
                map.extend(self.form_values());
                map
            }
            Location::Headers => self.header_values(),
            Location::Cookies => self.cookie_values(),
            Location::Files => self.file_values(),
            Location::Path => self.path_values(),
            Location::Custom(name) => self.extensions.get(name).cloned().unwrap_or_default(),
        }
    }

    /// Resolves an ordered list of locations and merges them into one
    /// multi-valued union. Locations are resolved one at a time, in
    /// order, so later locations' values land after earlier ones for
    /// the same key.
    #[must_use]
    pub fn values_for_all(&self, locations: &[Location]) -> MultiMap {
        let mut merged = MultiMap::new();
        for location in locations {
            merged.extend(self.values_for(location));
        }
        merged
    }

    fn query_values(&self) -> MultiMap {
        let query = self.uri.query().unwrap_or("");
        decode_pairs(query)
    }

    fn form_values(&self) -> MultiMap {
        if !self.has_content_type(&mime::APPLICATION_WWW_FORM_URLENCODED) {
            return MultiMap::new();
        }
        match std::str::from_utf8(&self.body) {
            Ok(body) => decode_pairs(body),
            Err(_) => MultiMap::new(),
        }
    }

    fn json_values(&self) -> MultiMap {
        if !self.has_content_type(&mime::APPLICATION_JSON) || self.body.is_empty() {
            return MultiMap::new();
        }
        match serde_json::from_slice::<serde_json::Value>(&self.body) {
            Ok(serde_json::Value::Object(members)) => members
                .into_iter()
                .map(|(key, value)| (key, RawValue::Json(value)))
                .collect(),
            _ => MultiMap::new(),
        }
    }

    fn header_values(&self) -> MultiMap {
        let mut map = MultiMap::new();
        for (name, value) in &self.headers {
            if let Ok(text) = value.to_str() {
                map.insert(name.as_str(), RawValue::Text(text.to_string()));
            }
        }
        map
    }

    fn cookie_values(&self) -> MultiMap {
        let mut map = MultiMap::new();
        let Some(header) = self.header(http::header::COOKIE.as_str()) else {
            return map;
        };
        for cookie in header.split(';') {
            if let Some((name, value)) = cookie.trim().split_once('=') {
                let value = value.trim().trim_matches('"');
                map.insert(name.trim(), RawValue::Text(value.to_string()));
            }
        }
        map
    }

    fn file_values(&self) -> MultiMap {
        let mut map = MultiMap::new();
        for (name, file) in &self.files {
            map.insert(name.as_str(), RawValue::File(file.clone()));
        }
        map
    }

    fn path_values(&self) -> MultiMap {
        let mut map = MultiMap::new();
        for (name, value) in &self.path_params {
            map.insert(name.as_str(), RawValue::Text(value.clone()));
        }
        map
    }

    fn has_content_type(&self, expected: &mime::Mime) -> bool {
        self.content_type()
            .and_then(|ct| ct.parse::<mime::Mime>().ok())
            .is_some_and(|ct| ct.essence_str() == expected.essence_str())
    }
}

fn decode_pairs(encoded: &str) -> MultiMap {
    serde_urlencoded::from_str::<Vec<(String, String)>>(encoded)
        .map(|pairs| {
            pairs
                .into_iter()
                .map(|(key, value)| (key, RawValue::Text(value)))
                .collect()
        })
        .unwrap_or_default()
}

/// Builder for constructing a [`RequestSnapshot`].
///
/// Defaults to a `GET /` request with no headers and an empty body.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    uri: Option<Uri>,
    headers: HeaderMap,
    body: Bytes,
    path_params: Vec<(String, String)>,
    files: Vec<(String, UploadedFile)>,
    extensions: IndexMap<String, MultiMap>,
}

impl RequestBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the request URI. Invalid URIs are ignored.
    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        if let Ok(uri) = uri.parse() {
            self.uri = Some(uri);
        }
        self
    }

    /// Adds a single header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<http::header::HeaderName>(),
            value.parse::<http::header::HeaderValue>(),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the raw request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and the matching Content-Type header.
    #[must_use]
    pub fn json(mut self, value: &serde_json::Value) -> Self {
        self.body = Bytes::from(value.to_string());
        self.header("content-type", mime::APPLICATION_JSON.as_ref())
    }

    /// Sets a URL-encoded form body and the matching Content-Type header.
    #[must_use]
    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        let encoded = serde_urlencoded::to_string(fields).unwrap_or_default();
        self.body = Bytes::from(encoded);
        self.header(
            "content-type",
            mime::APPLICATION_WWW_FORM_URLENCODED.as_ref(),
        )
    }

    /// Adds a path variable.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push((name.into(), value.into()));
        self
    }

    /// Attaches an uploaded file.
    #[must_use]
    pub fn file(mut self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.files.push((name.into(), file));
        self
    }

    /// Registers a named extension source resolvable via
    /// [`Location::Custom`].
    #[must_use]
    pub fn source(mut self, name: impl Into<String>, values: MultiMap) -> Self {
        self.extensions.insert(name.into(), values);
        self
    }

    /// Builds the snapshot.
    #[must_use]
    pub fn build(self) -> RequestSnapshot {
        RequestSnapshot {
            method: self.method.unwrap_or(Method::GET),
            uri: self.uri.unwrap_or_else(|| Uri::from_static("/")),
            headers: self.headers,
            body: self.body,
            path_params: self.path_params,
            files: self.files,
            extensions: self.extensions,
        }
    }
}
