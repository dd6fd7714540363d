//! Server request assembly
//!
//! Each submodule derives one part of a [`ServerRequest`] from an
//! [`Environment`]; [`server_request::from_environment`] composes them.
//!
//! # Examples
//!
//! ```
//! use httpmessage::environment::Environment;
//! use httpmessage::factory;
//! use httpmessage::http::{HttpMessage, RequestMessage};
//!
//! let env = Environment::builder()
//!     .server([
//!         ("HTTP_HOST", "test.com"),
//!         ("REQUEST_METHOD", "GET"),
//!         ("REQUEST_URI", "/path/123?q=abc"),
//!         ("QUERY_STRING", "q=abc"),
//!         ("REQUEST_SCHEME", "http"),
//!         ("SERVER_PORT", "1111"),
//!     ])
//!     .build();
//!
//! let request = factory::create(&env)?;
//! assert_eq!(request.uri().to_string(), "http://test.com:1111/path/123?q=abc");
//! assert_eq!(request.header("host"), ["test.com"]);
//! # Ok::<(), httpmessage::http::Error>(())
//! ```

pub mod files;
pub mod headers;
pub mod server_request;
pub mod uri;

use crate::environment::Environment;
use crate::http::{Result, ServerRequest};

/// Build a [`ServerRequest`] from an environment
pub fn create(env: &Environment) -> Result<ServerRequest> {
    server_request::from_environment(env)
}
