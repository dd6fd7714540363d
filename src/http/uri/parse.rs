//! URI string parsing
//!
//! Splits a URI reference into its components using the generic syntax of
//! RFC 3986 Appendix B and builds a [`Uri`] from them. Relative references
//! (`/path?query`, `//host/path`) are accepted; a missing path becomes `/`.

use super::{Uri, UriParts};
use crate::http::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static URI_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$")
        .expect("URI reference regex should be valid")
});

/// Components of an authority section
#[derive(Debug, Default, PartialEq)]
struct Authority<'a> {
    user: &'a str,
    password: &'a str,
    host: &'a str,
    port: Option<u16>,
}

/// Parse a URI string.
///
/// # Examples
///
/// ```
/// use httpmessage::http::uri::parse::parse;
///
/// let uri = parse("https://user@Example.com:8443/a?b=c#d")?;
/// assert_eq!(uri.host(), "example.com");
/// assert_eq!(uri.port(), Some(8443));
/// assert_eq!(uri.user_info(), "user");
/// # Ok::<(), httpmessage::http::Error>(())
/// ```
pub fn parse(input: &str) -> Result<Uri> {
    let captures = URI_REGEX
        .captures(input)
        .ok_or_else(|| Error::InvalidUri(input.to_string()))?;

    let scheme = captures.get(1).map_or("", |m| m.as_str());
    let authority = match captures.get(2) {
        Some(m) => parse_authority(m.as_str())?,
        None => Authority::default(),
    };
    let path = captures.get(3).map_or("", |m| m.as_str());

    Uri::from_parts(UriParts {
        scheme,
        host: authority.host,
        port: authority.port,
        path: if path.is_empty() { "/" } else { path },
        query: captures.get(4).map_or("", |m| m.as_str()),
        fragment: captures.get(5).map_or("", |m| m.as_str()),
        user: authority.user,
        password: authority.password,
    })
}

fn parse_authority(authority: &str) -> Result<Authority<'_>> {
    let (user_info, host_port) = match authority.rsplit_once('@') {
        Some((user_info, host_port)) => (Some(user_info), host_port),
        None => (None, authority),
    };

    let (user, password) = match user_info {
        Some(info) => info.split_once(':').unwrap_or((info, "")),
        None => ("", ""),
    };

    // IPv6 literals carry colons inside the brackets
    let port_sep = if host_port.starts_with('[') {
        let close = host_port.find(']').ok_or_else(|| {
            Error::InvalidUri(format!("unterminated IPv6 host in {:?}", authority))
        })?;
        host_port[close..].find(':').map(|pos| close + pos)
    } else {
        host_port.rfind(':')
    };

    let (host, port) = match port_sep {
        Some(pos) => (&host_port[..pos], parse_port(&host_port[pos + 1..], authority)?),
        None => (host_port, None),
    };

    Ok(Authority {
        user,
        password,
        host,
        port,
    })
}

fn parse_port(port: &str, authority: &str) -> Result<Option<u16>> {
    if port.is_empty() {
        return Ok(None);
    }
    port.parse::<u16>()
        .map(Some)
        .map_err(|_| Error::InvalidUri(format!("invalid port in {:?}", authority)))
}
