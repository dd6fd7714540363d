//! Raw request context
//!
//! An [`Environment`] is a snapshot of everything a gateway hands to an
//! application for one request: CGI-style server variables, the request
//! body, decoded post fields, cookies and the uploaded-files description.
//! The [`factory`](crate::factory) functions turn it into a
//! [`ServerRequest`](crate::http::ServerRequest).
//!
//! Accessors return `None` for missing variables rather than failing.

use crate::http::parser::{decode_form, BodyParser, CONTENT_TYPE_FORM};
use crate::http::{Body, BodySource, Params, Result};
use indexmap::IndexMap;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::io::{self, Read};
use tracing::debug;

/// Snapshot of a request as received from the gateway
#[derive(Debug, Clone)]
pub struct Environment {
    server: IndexMap<String, String>,
    body: Body,
    post: Params,
    cookies: IndexMap<String, String>,
    files: Value,
}

impl Environment {
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::default()
    }

    /// Capture the current CGI/1.1 request
    ///
    /// Server variables come from the process environment and the body from
    /// stdin, limited to `CONTENT_LENGTH` bytes; without `CONTENT_LENGTH`
    /// stdin is not read. Cookies are decoded from `HTTP_COOKIE` and post
    /// fields from form-urlencoded bodies.
    pub fn from_cgi() -> Result<Self> {
        let server: IndexMap<String, String> = std::env::vars().collect();

        let mut body = Vec::new();
        let content_length = server
            .get("CONTENT_LENGTH")
            .and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(length) = content_length {
            io::stdin().lock().take(length).read_to_end(&mut body)?;
        }

        let content_type = server
            .get("CONTENT_TYPE")
            .and_then(|v| v.split(';').next())
            .map_or("", str::trim);
        let post = if content_type == CONTENT_TYPE_FORM {
            decode_form(&body)
        } else {
            Params::new()
        };

        let cookies = server
            .get("HTTP_COOKIE")
            .map(String::as_str)
            .map(parse_cookie_header)
            .unwrap_or_default();

        debug!(
            variables = server.len(),
            body_len = body.len(),
            cookies = cookies.len(),
            "Captured CGI environment"
        );

        Ok(Environment::builder()
            .server(server)
            .body(body)
            .post(post)
            .cookies(cookies)
            .build())
    }

    fn var(&self, name: &str) -> Option<&str> {
        self.server.get(name).map(String::as_str)
    }

    /// `REQUEST_SCHEME`
    pub fn request_scheme(&self) -> Option<&str> {
        self.var("REQUEST_SCHEME")
    }

    /// `HTTP_HOST`
    pub fn host(&self) -> Option<&str> {
        self.var("HTTP_HOST")
    }

    /// `SERVER_PORT`, if it is a valid port number
    pub fn port(&self) -> Option<u16> {
        self.var("SERVER_PORT").and_then(|port| port.trim().parse().ok())
    }

    /// `REQUEST_URI`
    pub fn request_uri(&self) -> Option<&str> {
        self.var("REQUEST_URI")
    }

    /// `QUERY_STRING`
    pub fn query_string(&self) -> Option<&str> {
        self.var("QUERY_STRING")
    }

    /// `PHP_AUTH_USER`
    pub fn auth_user(&self) -> Option<&str> {
        self.var("PHP_AUTH_USER")
    }

    /// `PHP_AUTH_PW`
    pub fn auth_password(&self) -> Option<&str> {
        self.var("PHP_AUTH_PW")
    }

    /// `REQUEST_METHOD`
    pub fn request_method(&self) -> Option<&str> {
        self.var("REQUEST_METHOD")
    }

    /// Version part of `SERVER_PROTOCOL`: `"1.1"` for `HTTP/1.1`
    pub fn protocol_version(&self) -> Option<&str> {
        self.var("SERVER_PROTOCOL")
            .and_then(|protocol| protocol.split_once('/'))
            .map(|(_, version)| version)
    }

    /// Content type without parameters
    pub fn content_type(&self) -> Option<&str> {
        self.var("CONTENT_TYPE")
            .and_then(|value| value.split(';').next())
            .map(str::trim)
    }

    /// Whether the body carries form fields
    pub fn has_form_body(&self) -> bool {
        self.content_type().is_some_and(BodyParser::is_form)
    }

    pub fn server(&self) -> &IndexMap<String, String> {
        &self.server
    }

    pub fn cookies(&self) -> &IndexMap<String, String> {
        &self.cookies
    }

    /// Uploaded files description, shaped like PHP's `$_FILES`
    pub fn files(&self) -> &Value {
        &self.files
    }

    pub fn post(&self) -> &Params {
        &self.post
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

/// Parse a `Cookie` header: `a=1; b=hello%20world`
fn parse_cookie_header(header: &str) -> IndexMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| {
            (
                name.to_string(),
                percent_decode_str(value).decode_utf8_lossy().into_owned(),
            )
        })
        .collect()
}

/// Builder for [`Environment`]
#[derive(Debug)]
pub struct EnvironmentBuilder {
    server: IndexMap<String, String>,
    body: BodySource,
    post: Params,
    cookies: IndexMap<String, String>,
    files: Value,
}

impl Default for EnvironmentBuilder {
    fn default() -> Self {
        EnvironmentBuilder {
            server: IndexMap::new(),
            body: BodySource::Empty,
            post: Params::new(),
            cookies: IndexMap::new(),
            files: Value::Object(Params::new()),
        }
    }
}

impl EnvironmentBuilder {
    /// Set the server variables
    pub fn server<I, K, V>(mut self, server: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.server = server
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Set a single server variable
    pub fn var(mut self, name: &str, value: &str) -> Self {
        self.server.insert(name.to_string(), value.to_string());
        self
    }

    pub fn body(mut self, body: impl Into<BodySource>) -> Self {
        self.body = body.into();
        self
    }

    pub fn post(mut self, post: Params) -> Self {
        self.post = post;
        self
    }

    pub fn cookies<I, K, V>(mut self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.cookies = cookies
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Set the uploaded files description, shaped like PHP's `$_FILES`
    pub fn files(mut self, files: Value) -> Self {
        self.files = files;
        self
    }

    pub fn build(self) -> Environment {
        Environment {
            server: self.server,
            body: self.body.into_body(),
            post: self.post,
            cookies: self.cookies,
            files: self.files,
        }
    }
}
