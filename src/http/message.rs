//! HTTP message types
//!
//! This module defines the protocol version and method types, the
//! [`Message`] value shared by requests and responses, and the
//! [`HttpMessage`] trait that gives every message type its copy-on-write
//! header, body and version operations.

use super::{Body, BodySource, Error, HeaderValues, Headers, Result};
use std::fmt;

/// Request methods a message can carry
///
/// Tokens are case-sensitive: `"get"` is not a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
    Put,
    Patch,
    Head,
    Options,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Post,
        Method::Delete,
        Method::Put,
        Method::Patch,
        Method::Head,
        Method::Options,
    ];

    /// Look up a method by its token
    pub fn from_str(token: &str) -> Result<Self> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str() == token)
            .ok_or_else(|| Error::InvalidMethod(token.to_string()))
    }

    /// Look up a method and require it to be in `allowed`
    pub(crate) fn parse_allowed(token: &str, allowed: &[Method]) -> Result<Self> {
        match Method::from_str(token) {
            Ok(method) if allowed.contains(&method) => Ok(method),
            _ => Err(Error::InvalidMethod(format!(
                "{} (must be one of: {})",
                token,
                allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Version {
    Http10,
    #[default]
    Http11,
    Http20,
}

impl Version {
    /// Parse version from its bare number (`"1.0"`, `"1.1"` or `"2.0"`)
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "1.0" => Ok(Version::Http10),
            "1.1" => Ok(Version::Http11),
            "2.0" => Ok(Version::Http20),
            _ => Err(Error::InvalidVersion(s.to_string())),
        }
    }

    /// Convert version to its bare number
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "1.0",
            Version::Http11 => "1.1",
            Version::Http20 => "2.0",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol version, headers and body common to all HTTP messages
#[derive(Debug, Clone, Default)]
pub struct Message {
    version: Version,
    headers: Headers,
    body: Body,
}

impl Message {
    /// Create a new message
    ///
    /// Headers may be given as a [`Headers`] value or as raw name/value
    /// pairs; the body may be a string, bytes, an existing [`Body`] or
    /// nothing.
    pub fn new(headers: impl Into<Headers>, body: impl Into<BodySource>, version: Version) -> Self {
        Message {
            version,
            headers: headers.into(),
            body: body.into().into_body(),
        }
    }

    pub(crate) fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }
}

/// Copy-on-write operations shared by every message type
///
/// Implementors expose their embedded [`Message`]; all `with_*` methods
/// clone the receiver, change the copy and return it.
pub trait HttpMessage: Clone {
    fn message(&self) -> &Message;

    fn message_mut(&mut self) -> &mut Message;

    /// Hook run on a copy after its headers or body changed
    fn message_changed(&mut self) {}

    fn protocol_version(&self) -> Version {
        self.message().version
    }

    /// Return a copy with the given protocol version (`"1.0"`, `"1.1"` or `"2.0"`)
    fn with_protocol_version(&self, version: &str) -> Result<Self> {
        let version = Version::from_str(version)?;
        Ok(modify(self, |message| message.version = version))
    }

    fn headers(&self) -> &Headers {
        &self.message().headers
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers().contains(name)
    }

    /// Get all values of a header, or an empty slice if absent
    fn header(&self, name: &str) -> &[String] {
        self.headers().get(name)
    }

    /// Get the values of a header joined by commas
    fn header_line(&self, name: &str) -> String {
        self.headers().get_line(name)
    }

    /// Return a copy with the header replaced
    fn with_header(&self, name: &str, value: impl Into<HeaderValues>) -> Result<Self> {
        Headers::validate_name(name)?;
        let value = value.into();
        Ok(modify(self, |message| message.headers.set(name, value)))
    }

    /// Return a copy with values appended to the header
    fn with_added_header(&self, name: &str, value: impl Into<HeaderValues>) -> Result<Self> {
        Headers::validate_name(name)?;
        let value = value.into();
        Ok(modify(self, |message| message.headers.add(name, value)))
    }

    /// Return a copy without the header
    fn without_header(&self, name: &str) -> Self {
        modify(self, |message| message.headers.remove(name))
    }

    fn body(&self) -> &Body {
        &self.message().body
    }

    /// Return a copy with a different body
    fn with_body(&self, body: impl Into<BodySource>) -> Self {
        let body = body.into().into_body();
        modify(self, |message| message.body = body)
    }
}

/// Clone `source`, apply `change` to the copy's message and return the copy
pub(crate) fn modify<M: HttpMessage>(source: &M, change: impl FnOnce(&mut Message)) -> M {
    let mut copy = source.clone();
    change(copy.message_mut());
    copy.message_changed();
    copy
}

impl HttpMessage for Message {
    fn message(&self) -> &Message {
        self
    }

    fn message_mut(&mut self) -> &mut Message {
        self
    }
}
