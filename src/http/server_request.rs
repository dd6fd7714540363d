//! Server-side HTTP requests
//!
//! A [`ServerRequest`] is an incoming request together with the context the
//! server received it in: server parameters, cookies, uploaded files,
//! decoded query and body, and application attributes.
//!
//! Query parameters and the parsed body are derived on first read unless
//! they were set explicitly. A derived value is dropped when its source
//! changes: the query on [`with_uri`](RequestMessage::with_uri), the parsed
//! body on any header or body change.

use super::parser::{decode_form, BodyParser};
use super::request::{fill_host, IntoUri};
use super::{
    BodySource, Error, FileTree, Headers, HttpMessage, Message, Method, ParsedBody,
    RequestMessage, RequestParts, Result, Version,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::trace;

/// Decoded form or query fields
pub type Params = serde_json::Map<String, Value>;

/// Methods accepted by [`ServerRequest`]
pub const SERVER_REQUEST_METHODS: &[Method] = &[
    Method::Get,
    Method::Post,
    Method::Delete,
    Method::Put,
    Method::Patch,
];

/// A value that is either set explicitly or computed once on demand
#[derive(Debug, Clone)]
enum Derived<T> {
    Explicit(T),
    Deferred(OnceLock<T>),
}

impl<T> Derived<T> {
    fn deferred() -> Self {
        Derived::Deferred(OnceLock::new())
    }

    fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        match self {
            Derived::Explicit(value) => value,
            Derived::Deferred(cell) => cell.get_or_init(init),
        }
    }

    /// Drop a computed value; explicit values are kept
    fn reset(&mut self) {
        if let Derived::Deferred(_) = self {
            *self = Derived::deferred();
        }
    }
}

/// An incoming HTTP request with its server context
#[derive(Debug, Clone)]
pub struct ServerRequest {
    message: Message,
    parts: RequestParts,
    server_params: IndexMap<String, String>,
    cookies: IndexMap<String, String>,
    uploaded_files: IndexMap<String, FileTree>,
    query_params: Derived<Params>,
    parsed_body: Derived<Option<ParsedBody>>,
    attributes: IndexMap<String, Value>,
}

impl ServerRequest {
    pub fn builder() -> ServerRequestBuilder {
        ServerRequestBuilder::new()
    }

    /// Server parameters as received, never modified
    pub fn server_params(&self) -> &IndexMap<String, String> {
        &self.server_params
    }

    pub fn cookie_params(&self) -> &IndexMap<String, String> {
        &self.cookies
    }

    /// Return a copy with the cookies replaced
    pub fn with_cookie_params<I, K, V>(&self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut copy = self.clone();
        copy.cookies = collect_strings(cookies);
        copy
    }

    /// Get the query parameters, decoded from the URI query unless set
    pub fn query_params(&self) -> &Params {
        self.query_params.get_or_init(|| {
            trace!(query = self.uri().query(), "Decoding query parameters");
            decode_form(self.uri().query().as_bytes())
        })
    }

    /// Return a copy with explicit query parameters
    ///
    /// The URI is left unchanged.
    pub fn with_query_params(&self, query: Params) -> Self {
        let mut copy = self.clone();
        copy.query_params = Derived::Explicit(query);
        copy
    }

    pub fn uploaded_files(&self) -> &IndexMap<String, FileTree> {
        &self.uploaded_files
    }

    /// Return a copy with the uploaded files replaced
    pub fn with_uploaded_files(&self, files: IndexMap<String, FileTree>) -> Self {
        let mut copy = self.clone();
        copy.uploaded_files = files;
        copy
    }

    /// Get the parsed body
    ///
    /// Unless set explicitly, the body is decoded according to the first
    /// `Content-Type` value. Unknown content types and malformed bodies
    /// yield `None`.
    pub fn parsed_body(&self) -> Option<&ParsedBody> {
        self.parsed_body
            .get_or_init(|| {
                let content_type = self.header("Content-Type").first().map_or("", String::as_str);
                trace!(content_type, "Parsing request body");
                BodyParser::new(content_type).parse(&self.body().to_bytes())
            })
            .as_ref()
    }

    /// Return a copy with an explicit parsed body
    ///
    /// JSON data must be an object or an array; JSON `null` is the same as
    /// `None`.
    pub fn with_parsed_body(&self, data: Option<ParsedBody>) -> Result<Self> {
        let data = validate_parsed_body(data)?;
        let mut copy = self.clone();
        copy.parsed_body = Derived::Explicit(data);
        Ok(copy)
    }

    pub fn attributes(&self) -> &IndexMap<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Get an attribute, or `default` if it is not set
    pub fn attribute_or(&self, name: &str, default: Value) -> Value {
        self.attribute(name).cloned().unwrap_or(default)
    }

    /// Return a copy with the attribute set
    pub fn with_attribute(&self, name: &str, value: impl Into<Value>) -> Self {
        let mut copy = self.clone();
        copy.attributes.insert(name.to_string(), value.into());
        copy
    }

    /// Return a copy without the attribute; no-op if it is not set
    pub fn without_attribute(&self, name: &str) -> Self {
        let mut copy = self.clone();
        copy.attributes.shift_remove(name);
        copy
    }
}

fn validate_parsed_body(data: Option<ParsedBody>) -> Result<Option<ParsedBody>> {
    match data {
        Some(ParsedBody::Json(Value::Null)) => Ok(None),
        Some(ParsedBody::Json(ref value)) if !(value.is_object() || value.is_array()) => {
            Err(Error::InvalidParsedBody(format!(
                "expected an object, an array or nothing, got {}",
                value
            )))
        }
        data => Ok(data),
    }
}

fn collect_strings<I, K, V>(items: I) -> IndexMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    items
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

impl HttpMessage for ServerRequest {
    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }

    fn message_changed(&mut self) {
        self.parsed_body.reset();
    }
}

impl RequestMessage for ServerRequest {
    const ALLOWED_METHODS: &'static [Method] = SERVER_REQUEST_METHODS;

    fn parts(&self) -> &RequestParts {
        &self.parts
    }

    fn parts_mut(&mut self) -> &mut RequestParts {
        &mut self.parts
    }

    fn uri_changed(&mut self) {
        self.query_params.reset();
    }
}

/// Builder for [`ServerRequest`]
#[derive(Debug)]
pub struct ServerRequestBuilder {
    method: String,
    headers: Headers,
    body: BodySource,
    version: String,
    server_params: IndexMap<String, String>,
    cookies: IndexMap<String, String>,
    uploaded_files: IndexMap<String, FileTree>,
    parsed_body: Option<Option<ParsedBody>>,
    attributes: IndexMap<String, Value>,
}

impl ServerRequestBuilder {
    /// Create a builder for a `GET` request over HTTP/1.1
    pub fn new() -> Self {
        ServerRequestBuilder {
            method: Method::Get.as_str().to_string(),
            headers: Headers::new(),
            body: BodySource::Empty,
            version: Version::Http11.as_str().to_string(),
            server_params: IndexMap::new(),
            cookies: IndexMap::new(),
            uploaded_files: IndexMap::new(),
            parsed_body: None,
            attributes: IndexMap::new(),
        }
    }

    pub fn method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn headers(mut self, headers: impl Into<Headers>) -> Self {
        self.headers = headers.into();
        self
    }

    pub fn body(mut self, body: impl Into<BodySource>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the protocol version (`"1.0"`, `"1.1"` or `"2.0"`)
    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn server_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.server_params = collect_strings(params);
        self
    }

    pub fn cookies<I, K, V>(mut self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.cookies = collect_strings(cookies);
        self
    }

    pub fn uploaded_files(mut self, files: IndexMap<String, FileTree>) -> Self {
        self.uploaded_files = files;
        self
    }

    /// Set the parsed body instead of decoding it from the body
    pub fn parsed_body(mut self, data: Option<ParsedBody>) -> Self {
        self.parsed_body = Some(data);
        self
    }

    pub fn attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Build the request for the given URI
    pub fn build(self, uri: impl IntoUri) -> Result<ServerRequest> {
        let uri = uri.into_uri()?;
        let method = Method::parse_allowed(&self.method, SERVER_REQUEST_METHODS)?;
        let version = Version::from_str(&self.version)?;
        let parsed_body = match self.parsed_body {
            Some(data) => Derived::Explicit(validate_parsed_body(data)?),
            None => Derived::deferred(),
        };

        let mut message = Message::new(self.headers, self.body, version);
        fill_host(&mut message, &uri);

        Ok(ServerRequest {
            message,
            parts: RequestParts::new(method, uri),
            server_params: self.server_params,
            cookies: self.cookies,
            uploaded_files: self.uploaded_files,
            query_params: Derived::deferred(),
            parsed_body,
            attributes: self.attributes,
        })
    }
}

impl Default for ServerRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
