//! Client-side HTTP requests
//!
//! [`RequestParts`] carries what every request adds on top of a
//! [`Message`]: the method, the target [`Uri`] and an optional explicit
//! request target. The [`RequestMessage`] trait implements the shared
//! request behavior, including keeping the `Host` header in line with the
//! URI, for both [`Request`] and [`ServerRequest`](super::ServerRequest).

use super::message::modify;
use super::{BodySource, Headers, HttpMessage, Message, Method, Result, Uri, Version};
use tracing::trace;

/// Methods accepted by [`Request`]
pub const REQUEST_METHODS: &[Method] = &[
    Method::Get,
    Method::Post,
    Method::Delete,
    Method::Put,
    Method::Patch,
    Method::Head,
    Method::Options,
];

/// Values that can be turned into a [`Uri`]
pub trait IntoUri {
    fn into_uri(self) -> Result<Uri>;
}

impl IntoUri for Uri {
    fn into_uri(self) -> Result<Uri> {
        Ok(self)
    }
}

impl IntoUri for &Uri {
    fn into_uri(self) -> Result<Uri> {
        Ok(self.clone())
    }
}

impl IntoUri for &str {
    fn into_uri(self) -> Result<Uri> {
        self.parse()
    }
}

impl IntoUri for String {
    fn into_uri(self) -> Result<Uri> {
        self.parse()
    }
}

impl IntoUri for &String {
    fn into_uri(self) -> Result<Uri> {
        self.parse()
    }
}

/// Method, URI and request target of a request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestParts {
    method: Method,
    uri: Uri,
    request_target: Option<String>,
}

impl RequestParts {
    pub fn new(method: Method, uri: Uri) -> Self {
        RequestParts {
            method,
            uri,
            request_target: None,
        }
    }
}

/// Request behavior shared by [`Request`] and
/// [`ServerRequest`](super::ServerRequest)
pub trait RequestMessage: HttpMessage {
    /// Methods this request type accepts
    const ALLOWED_METHODS: &'static [Method];

    fn parts(&self) -> &RequestParts;

    fn parts_mut(&mut self) -> &mut RequestParts;

    /// Hook run on a copy after its URI changed
    fn uri_changed(&mut self) {}

    fn method(&self) -> Method {
        self.parts().method
    }

    /// Return a copy with a different method
    ///
    /// The method is matched case-sensitively against
    /// [`ALLOWED_METHODS`](Self::ALLOWED_METHODS).
    fn with_method(&self, method: &str) -> Result<Self> {
        let method = Method::parse_allowed(method, Self::ALLOWED_METHODS)?;
        let mut copy = self.clone();
        copy.parts_mut().method = method;
        Ok(copy)
    }

    fn uri(&self) -> &Uri {
        &self.parts().uri
    }

    /// Return a copy targeting a different URI
    ///
    /// Unless `preserve_host` is set, a non-empty URI host replaces the
    /// `Host` header. With `preserve_host`, the header is only filled in
    /// when it is absent or empty.
    fn with_uri(&self, uri: Uri, preserve_host: bool) -> Self {
        let mut copy = modify(self, |message| {
            if preserve_host {
                fill_host(message, &uri);
            } else if !uri.host().is_empty() {
                message.headers_mut().set("Host", uri.host());
            }
        });
        copy.parts_mut().uri = uri;
        copy.uri_changed();
        copy
    }

    /// Get the request target
    ///
    /// An explicit target set by [`with_request_target`](Self::with_request_target)
    /// wins; otherwise the target is the URI path followed by `?query` when
    /// the query is non-empty.
    fn request_target(&self) -> String {
        let parts = self.parts();
        if let Some(target) = &parts.request_target {
            return target.clone();
        }

        let path = match parts.uri.path() {
            "" => "/",
            path => path,
        };
        match parts.uri.query() {
            "" => path.to_string(),
            query => format!("{}?{}", path, query),
        }
    }

    /// Return a copy with a verbatim request target
    fn with_request_target(&self, target: &str) -> Self {
        let mut copy = self.clone();
        copy.parts_mut().request_target = Some(target.to_string());
        copy
    }
}

/// Set `Host` from the URI when the header is absent or empty
pub(crate) fn fill_host(message: &mut Message, uri: &Uri) {
    let host_missing = message.header("Host").iter().all(|value| value.is_empty());
    if !uri.host().is_empty() && host_missing {
        trace!(host = uri.host(), "Deriving Host header from URI");
        message.headers_mut().set("Host", uri.host());
    }
}

/// An outgoing HTTP request
#[derive(Debug, Clone)]
pub struct Request {
    message: Message,
    parts: RequestParts,
}

impl Request {
    /// Create a request using HTTP/1.1
    ///
    /// # Examples
    ///
    /// ```
    /// use httpmessage::http::{Headers, HttpMessage, Request, RequestMessage};
    ///
    /// let request = Request::new("PUT", "http://test.com/items/1?v=2", Headers::new(), "{}")?;
    /// assert_eq!(request.request_target(), "/items/1?v=2");
    /// assert_eq!(request.header_line("host"), "test.com");
    /// # Ok::<(), httpmessage::http::Error>(())
    /// ```
    pub fn new(
        method: &str,
        uri: impl IntoUri,
        headers: impl Into<Headers>,
        body: impl Into<BodySource>,
    ) -> Result<Self> {
        Request::builder()
            .method(method)
            .headers(headers)
            .body(body)
            .build(uri)
    }

    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }
}

impl HttpMessage for Request {
    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl RequestMessage for Request {
    const ALLOWED_METHODS: &'static [Method] = REQUEST_METHODS;

    fn parts(&self) -> &RequestParts {
        &self.parts
    }

    fn parts_mut(&mut self) -> &mut RequestParts {
        &mut self.parts
    }
}

/// Builder for [`Request`]
#[derive(Debug)]
pub struct RequestBuilder {
    method: String,
    headers: Headers,
    body: BodySource,
    version: String,
}

impl RequestBuilder {
    /// Create a builder for a `GET` request over HTTP/1.1
    pub fn new() -> Self {
        RequestBuilder {
            method: Method::Get.as_str().to_string(),
            headers: Headers::new(),
            body: BodySource::Empty,
            version: Version::Http11.as_str().to_string(),
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

    /// Add a single header
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.add(name, value);
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

    /// Build the request for the given URI
    pub fn build(self, uri: impl IntoUri) -> Result<Request> {
        let uri = uri.into_uri()?;
        let method = Method::parse_allowed(&self.method, REQUEST_METHODS)?;
        let version = Version::from_str(&self.version)?;

        let mut message = Message::new(self.headers, self.body, version);
        fill_host(&mut message, &uri);

        Ok(Request {
            message,
            parts: RequestParts::new(method, uri),
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
