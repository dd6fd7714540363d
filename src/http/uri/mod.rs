//! URI value object
//!
//! This module provides [`Uri`], an immutable representation of an
//! RFC 3986 URI restricted to the `http` and `https` schemes (or none).
//! Components are normalized on the way in: scheme and host are lowercased,
//! path, query and fragment are percent-encoded without double-encoding
//! existing escapes, and the standard port of the scheme is suppressed.

pub mod parse;
pub mod validator;

use super::{Error, Result, DEFAULT_HTTPS_PORT, DEFAULT_HTTP_PORT};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;
use std::str::FromStr;

/// Characters left untouched by [`percent_encode`]: unreserved, sub-delims,
/// `:`, `@`, `/` and `%` (stray percent signs are handled separately).
const URI_CHARS: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@')
    .remove(b'/')
    .remove(b'%');

/// A user name may not carry the `:` and `@` that delimit user information.
const USER_CHARS: &AsciiSet = &URI_CHARS.add(b':').add(b'@').add(b'/');

/// A password may carry `:` but not `@`.
const PASSWORD_CHARS: &AsciiSet = &URI_CHARS.add(b'@').add(b'/');

/// Percent-encode a path, query or fragment.
///
/// A `%` followed by two hex digits is an existing escape and passes
/// through unchanged; any other `%` becomes `%25`.
pub fn percent_encode(input: &str) -> String {
    encode_with(input, URI_CHARS)
}

fn encode_with(input: &str, chars: &'static AsciiSet) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut start = 0;

    for (pos, _) in input.match_indices('%') {
        out.extend(utf8_percent_encode(&input[start..pos], chars));
        if is_escape(&bytes[pos..]) {
            out.push('%');
        } else {
            out.push_str("%25");
        }
        start = pos + 1;
    }
    out.extend(utf8_percent_encode(&input[start..], chars));

    out
}

fn is_escape(bytes: &[u8]) -> bool {
    bytes.len() >= 3 && bytes[1].is_ascii_hexdigit() && bytes[2].is_ascii_hexdigit()
}

/// Encode a path and collapse multiple leading slashes into one.
fn normalize_path(path: &str) -> String {
    let encoded = percent_encode(path);
    if encoded.starts_with('/') {
        format!("/{}", encoded.trim_start_matches('/'))
    } else {
        encoded
    }
}

/// URI scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scheme {
    #[default]
    None,
    Http,
    Https,
}

impl Scheme {
    /// Parse and normalize a scheme.
    ///
    /// Matching is case-insensitive and a mistakenly included `://` is
    /// stripped, so `"HTTPS://"` yields [`Scheme::Https`].
    pub fn parse(s: &str) -> Result<Self> {
        let normalized = s.to_ascii_lowercase().replace("://", "");
        match normalized.as_str() {
            "" => Ok(Scheme::None),
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            _ => Err(Error::InvalidScheme(s.to_string())),
        }
    }

    /// Convert scheme to string (empty for [`Scheme::None`])
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::None => "",
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// The port a URI of this scheme omits from its string form
    pub fn standard_port(&self) -> Option<u16> {
        match self {
            Scheme::None => None,
            Scheme::Http => Some(DEFAULT_HTTP_PORT),
            Scheme::Https => Some(DEFAULT_HTTPS_PORT),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw URI components, used to construct a [`Uri`] in one step.
#[derive(Debug, Clone)]
pub struct UriParts<'a> {
    pub scheme: &'a str,
    pub host: &'a str,
    pub port: Option<u16>,
    pub path: &'a str,
    pub query: &'a str,
    pub fragment: &'a str,
    pub user: &'a str,
    pub password: &'a str,
}

impl Default for UriParts<'_> {
    fn default() -> Self {
        UriParts {
            scheme: "",
            host: "",
            port: None,
            path: "/",
            query: "",
            fragment: "",
            user: "",
            password: "",
        }
    }
}

/// Immutable URI value object
///
/// Every `with_*` method validates its input and returns a new `Uri`; on
/// failure the receiver is untouched and an error is returned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Uri {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    path: String,
    query: String,
    fragment: String,
    user: String,
    password: String,
}

impl Uri {
    /// Create a URI from a scheme and host with the root path.
    pub fn new(scheme: &str, host: &str) -> Result<Self> {
        Self::from_parts(UriParts {
            scheme,
            host,
            ..UriParts::default()
        })
    }

    /// Create a URI from raw components.
    ///
    /// The port is stored as given; range validation applies to
    /// [`Uri::with_port`] only.
    pub fn from_parts(parts: UriParts<'_>) -> Result<Self> {
        Ok(Uri {
            scheme: Scheme::parse(parts.scheme)?,
            host: parts.host.to_lowercase(),
            port: parts.port,
            path: normalize_path(parts.path),
            query: percent_encode(parts.query.strip_prefix('?').unwrap_or(parts.query)),
            fragment: percent_encode(parts.fragment.strip_prefix('#').unwrap_or(parts.fragment)),
            user: encode_with(parts.user, USER_CHARS),
            password: encode_with(parts.password, PASSWORD_CHARS),
        })
    }

    /// Get the scheme, or an empty string if none is present
    pub fn scheme(&self) -> &str {
        self.scheme.as_str()
    }

    /// Get the authority in `[user-info@]host[:port]` form
    pub fn authority(&self) -> String {
        let mut authority = String::new();
        let user_info = self.user_info();
        if !user_info.is_empty() {
            authority.push_str(&user_info);
            authority.push('@');
        }
        authority.push_str(&self.host);
        if let Some(port) = self.port() {
            authority.push(':');
            authority.push_str(&port.to_string());
        }
        authority
    }

    /// Get the percent-encoded user information in `user[:password]` form
    pub fn user_info(&self) -> String {
        if self.user.is_empty() {
            String::new()
        } else if self.password.is_empty() {
            self.user.clone()
        } else {
            format!("{}:{}", self.user, self.password)
        }
    }

    /// Get the lowercased host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the port, or `None` if unset or standard for the scheme
    pub fn port(&self) -> Option<u16> {
        match self.port {
            Some(port) if Some(port) == self.scheme.standard_port() => None,
            port => port,
        }
    }

    /// Get the percent-encoded path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the percent-encoded query, without the leading `?`
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Get the percent-encoded fragment, without the leading `#`
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn with_scheme(&self, scheme: &str) -> Result<Self> {
        let scheme = Scheme::parse(scheme)?;
        Ok(Uri {
            scheme,
            ..self.clone()
        })
    }

    /// An empty user removes the user information. Delimiters inside the
    /// user or password are percent-encoded.
    pub fn with_user_info(&self, user: &str, password: Option<&str>) -> Self {
        Uri {
            user: encode_with(user, USER_CHARS),
            password: encode_with(password.unwrap_or_default(), PASSWORD_CHARS),
            ..self.clone()
        }
    }

    pub fn with_host(&self, host: &str) -> Self {
        Uri {
            host: host.to_lowercase(),
            ..self.clone()
        }
    }

    /// `None` removes the port.
    pub fn with_port(&self, port: Option<u16>) -> Result<Self> {
        validator::validate_port(port)?;
        Ok(Uri {
            port,
            ..self.clone()
        })
    }

    /// The path must not carry a query string or fragment.
    pub fn with_path(&self, path: &str) -> Result<Self> {
        validator::validate_path(path)?;
        Ok(Uri {
            path: normalize_path(path),
            ..self.clone()
        })
    }

    /// The query must not carry a fragment; a leading `?` is dropped.
    pub fn with_query(&self, query: &str) -> Result<Self> {
        validator::validate_query(query)?;
        let query = query.strip_prefix('?').unwrap_or(query);
        Ok(Uri {
            query: percent_encode(query),
            ..self.clone()
        })
    }

    pub fn with_fragment(&self, fragment: &str) -> Self {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        Uri {
            fragment: percent_encode(fragment),
            ..self.clone()
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scheme != Scheme::None {
            write!(f, "{}:", self.scheme)?;
        }
        let authority = self.authority();
        if !authority.is_empty() {
            write!(f, "//{}", authority)?;
        }
        write!(f, "/{}", self.path.trim_start_matches('/'))?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        if !self.fragment.is_empty() {
            write!(f, "#{}", self.fragment)?;
        }
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse::parse(s)
    }
}
