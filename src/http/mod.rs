//! HTTP message model
//!
//! This module provides immutable value objects for HTTP messages: requests,
//! server-side requests, responses, URIs, headers, uploaded files and body
//! streams. Every `with_*` operation returns a new value and leaves the
//! receiver untouched.
//!
//! # Architecture
//!
//! Messages are built by composition rather than inheritance:
//!
//! - [`Message`] holds the protocol version, [`Headers`] and the [`Body`]
//! - [`Request`] and [`ServerRequest`] embed a `Message` plus [`RequestParts`]
//! - [`Response`] embeds a `Message` plus a status code and reason phrase
//!
//! Shared behavior lives in the [`HttpMessage`] and [`RequestMessage`] traits,
//! whose provided methods operate on the embedded parts.
//!
//! # Examples
//!
//! ```
//! use httpmessage::http::{Headers, HttpMessage, Request, RequestMessage};
//!
//! let request = Request::new("GET", "http://Example.com:8080/a b?x=1", Headers::new(), "")?;
//! assert_eq!(request.uri().to_string(), "http://example.com:8080/a%20b?x=1");
//! assert_eq!(request.header("Host"), ["example.com"]);
//!
//! let posted = request.with_method("POST")?;
//! assert_eq!(request.method().as_str(), "GET");
//! assert_eq!(posted.method().as_str(), "POST");
//! # Ok::<(), httpmessage::http::Error>(())
//! ```

pub mod headers;
pub mod message;
pub mod parser;
pub mod request;
pub mod response;
pub mod server_request;
pub mod stream;
pub mod upload;
pub mod uri;

pub use headers::{HeaderValues, Headers};
pub use message::{HttpMessage, Message, Method, Version};
pub use parser::{BodyParser, ParsedBody, XmlElement};
pub use request::{IntoUri, Request, RequestBuilder, RequestMessage, RequestParts};
pub use response::{Response, ResponseBuilder, Status};
pub use server_request::{Params, ServerRequest, ServerRequestBuilder};
pub use stream::{Body, BodySource, HandleStream, MemoryStream, Stream, StreamMetadata};
pub use upload::{FileTree, FsMover, UploadMover, UploadedFile, UPLOAD_ERR_OK};
pub use uri::{Scheme, Uri};

use std::path::PathBuf;

/// Result type for HTTP message operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP message errors
///
/// The first group are caller errors (invalid arguments), reported at
/// construction or mutation time. The second group are lifecycle faults.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid URI scheme: {0:?} (must be one of \"\", \"http\", \"https\")")]
    InvalidScheme(String),

    #[error("Invalid URI port: {0} (must be greater than 1 and less than 65535)")]
    InvalidPort(u16),

    #[error("Invalid URI path: {0}")]
    InvalidPath(String),

    #[error("Invalid URI query: {0}")]
    InvalidQuery(String),

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Invalid HTTP version: {0} (must be one of 1.0, 1.1, 2.0)")]
    InvalidVersion(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid HTTP status: {0} (must be between 100 and 599)")]
    InvalidStatus(u16),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid parsed body: {0}")]
    InvalidParsedBody(String),

    #[error("Upload target path is not writable: {}", .0.display())]
    InvalidUploadTarget(PathBuf),

    #[error("Stream is detached")]
    Detached,

    #[error("Uploaded file {0} has already been moved")]
    AlreadyMoved(String),

    #[error("{} is not a valid uploaded file", .0.display())]
    NotUploaded(PathBuf),

    #[error("Error moving uploaded file {} to {}", .from.display(), .to.display())]
    MoveFailed { from: PathBuf, to: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error reports an invalid argument from the caller, as
    /// opposed to a violated lifecycle invariant or an I/O failure.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Error::InvalidScheme(_)
                | Error::InvalidPort(_)
                | Error::InvalidPath(_)
                | Error::InvalidQuery(_)
                | Error::InvalidUri(_)
                | Error::InvalidVersion(_)
                | Error::InvalidMethod(_)
                | Error::InvalidStatus(_)
                | Error::InvalidHeader(_)
                | Error::InvalidParsedBody(_)
                | Error::InvalidUploadTarget(_)
        )
    }
}

/// Standard port for plain HTTP
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Standard port for HTTPS
pub const DEFAULT_HTTPS_PORT: u16 = 443;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::InvalidPort(1).is_invalid_argument());
        assert!(Error::InvalidMethod("TRACE".into()).is_invalid_argument());
        assert!(!Error::Detached.is_invalid_argument());
        assert!(!Error::AlreadyMoved("a.txt".into()).is_invalid_argument());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::InvalidVersion("3.0".into()).to_string(),
            "Invalid HTTP version: 3.0 (must be one of 1.0, 1.1, 2.0)"
        );
        assert_eq!(
            Error::MoveFailed { from: "/tmp/a".into(), to: "/srv/b".into() }.to_string(),
            "Error moving uploaded file /tmp/a to /srv/b"
        );
    }
}
