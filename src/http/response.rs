//! HTTP responses and status codes

use super::{BodySource, Error, Headers, HttpMessage, Message, Result, Version};
use std::fmt;

/// HTTP status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status {
    code: u16,
}

impl Status {
    /// Create a new status code, which must lie in 100..=599
    pub fn new(code: u16) -> Result<Self> {
        if (100..600).contains(&code) {
            Ok(Status { code })
        } else {
            Err(Error::InvalidStatus(code))
        }
    }

    /// Get the status code
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Get the canonical reason phrase for this status code, if one is known
    pub fn reason_phrase(&self) -> Option<&'static str> {
        let phrase = match self.code {
            // Informational 1xx
            100 => "Continue",
            101 => "Switching Protocols",
            102 => "Processing",
            // Successful 2xx
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            203 => "Non-Authoritative Information",
            204 => "No Content",
            205 => "Reset Content",
            206 => "Partial Content",
            207 => "Multi-Status",
            208 => "Already Reported",
            226 => "IM Used",
            // Redirection 3xx
            300 => "Multiple Choices",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            305 => "Use Proxy",
            306 => "(Unused)",
            307 => "Temporary Redirect",
            308 => "Permanent Redirect",
            // Client Error 4xx
            400 => "Bad Request",
            401 => "Unauthorized",
            402 => "Payment Required",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            406 => "Not Acceptable",
            407 => "Proxy Authentication Required",
            408 => "Request Timeout",
            409 => "Conflict",
            410 => "Gone",
            411 => "Length Required",
            412 => "Precondition Failed",
            413 => "Request Entity Too Large",
            414 => "Request-URI Too Long",
            415 => "Unsupported Media Type",
            416 => "Requested Range Not Satisfiable",
            417 => "Expectation Failed",
            418 => "I'm a teapot",
            422 => "Unprocessable Entity",
            423 => "Locked",
            424 => "Failed Dependency",
            426 => "Upgrade Required",
            428 => "Precondition Required",
            429 => "Too Many Requests",
            431 => "Request Header Fields Too Large",
            451 => "Unavailable For Legal Reasons",
            // Server Error 5xx
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            505 => "HTTP Version Not Supported",
            506 => "Variant Also Negotiates",
            507 => "Insufficient Storage",
            508 => "Loop Detected",
            510 => "Not Extended",
            511 => "Network Authentication Required",
            _ => return None,
        };
        Some(phrase)
    }

    /// Check if this is an informational status (1xx)
    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// Check if this is a success status (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Check if this is a redirection status (3xx)
    pub fn is_redirection(&self) -> bool {
        (300..400).contains(&self.code)
    }

    /// Check if this is a client error status (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.code)
    }

    /// Check if this is a server error status (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.code)
    }

    // Common status codes as constants
    pub const OK: Status = Status { code: 200 };
    pub const NOT_FOUND: Status = Status { code: 404 };
    pub const INTERNAL_SERVER_ERROR: Status = Status { code: 500 };
}

impl Default for Status {
    fn default() -> Self {
        Status::OK
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason_phrase() {
            Some(phrase) => write!(f, "{} {}", self.code, phrase),
            None => write!(f, "{}", self.code),
        }
    }
}

/// HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    message: Message,
    status: Status,
    reason: String,
}

impl Response {
    /// Create a response using HTTP/1.1
    pub fn new(
        status: u16,
        headers: impl Into<Headers>,
        body: impl Into<BodySource>,
    ) -> Result<Self> {
        Response::builder()
            .status(status)
            .headers(headers)
            .body(body)
            .build()
    }

    /// Create a builder for constructing responses
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// Get the status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Get the status code
    pub fn status_code(&self) -> u16 {
        self.status.code()
    }

    /// Get the reason phrase
    ///
    /// A phrase set through [`with_status`](Self::with_status) wins; then the
    /// canonical phrase for the code; otherwise an empty string.
    pub fn reason_phrase(&self) -> &str {
        if !self.reason.is_empty() {
            return &self.reason;
        }
        self.status.reason_phrase().unwrap_or("")
    }

    /// Return a copy with a different status
    ///
    /// An empty `reason` selects the canonical phrase for `code`.
    pub fn with_status(&self, code: u16, reason: &str) -> Result<Self> {
        let status = Status::new(code)?;
        let mut copy = self.clone();
        copy.status = status;
        copy.reason = match reason {
            "" => status.reason_phrase().unwrap_or_default().to_string(),
            reason => reason.to_string(),
        };
        Ok(copy)
    }
}

impl HttpMessage for Response {
    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

/// Builder for HTTP responses
#[derive(Debug)]
pub struct ResponseBuilder {
    version: Option<Version>,
    status: u16,
    reason: Option<String>,
    headers: Headers,
    body: BodySource,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        ResponseBuilder {
            version: None,
            status: Status::OK.code(),
            reason: None,
            headers: Headers::new(),
            body: BodySource::Empty,
        }
    }
}

impl ResponseBuilder {
    /// Set the HTTP version
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the status code
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set the reason phrase
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Replace all headers
    pub fn headers(mut self, headers: impl Into<Headers>) -> Self {
        self.headers = headers.into();
        self
    }

    /// Add a header
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<BodySource>) -> Self {
        self.body = body.into();
        self
    }

    /// Build the response
    pub fn build(self) -> Result<Response> {
        let status = Status::new(self.status)?;
        Ok(Response {
            message: Message::new(self.headers, self.body, self.version.unwrap_or_default()),
            status,
            reason: self.reason.unwrap_or_default(),
        })
    }
}
