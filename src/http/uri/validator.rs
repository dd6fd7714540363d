//! Syntax checks for URI components
//!
//! These predicates guard the `with_*` mutators of [`Uri`](super::Uri);
//! each returns an invalid-argument error describing the offending input.

use crate::http::{Error, Result};

/// Validate a port.
///
/// `None` is accepted. A port must be strictly between 1 and 65535, so
/// both endpoints are rejected.
pub fn validate_port(port: Option<u16>) -> Result<()> {
    match port {
        Some(port) if port <= 1 || port == u16::MAX => Err(Error::InvalidPort(port)),
        _ => Ok(()),
    }
}

/// Validate a path: it must pass [`validate_query`] and carry no query string.
pub fn validate_path(path: &str) -> Result<()> {
    validate_query(path).map_err(|_| {
        Error::InvalidPath(format!("{:?} must not contain a URI fragment", path))
    })?;

    if path.contains('?') {
        return Err(Error::InvalidPath(format!(
            "{:?} must not contain a query string",
            path
        )));
    }

    Ok(())
}

/// Validate a query string: it must carry no fragment.
pub fn validate_query(query: &str) -> Result<()> {
    if query.contains('#') {
        return Err(Error::InvalidQuery(format!(
            "{:?} must not contain a URI fragment",
            query
        )));
    }

    Ok(())
}
