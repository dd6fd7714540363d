//! Server request from an environment

use super::{files, headers, uri};
use crate::environment::Environment;
use crate::http::{Method, ParsedBody, RequestMessage, Result, ServerRequest, Version};
use tracing::debug;

/// Build a [`ServerRequest`] from an environment
///
/// A missing `REQUEST_METHOD` means `GET` and a missing `SERVER_PROTOCOL`
/// means HTTP/1.1. For form `POST`s the environment's decoded post fields
/// become the parsed body, since the raw body of a multipart upload may
/// already have been consumed by the gateway.
pub fn from_environment(env: &Environment) -> Result<ServerRequest> {
    let uri = uri::from_environment(env)?;
    let method = env.request_method().unwrap_or(Method::Get.as_str());
    let version = env.protocol_version().unwrap_or(Version::Http11.as_str());

    let mut builder = ServerRequest::builder()
        .method(method)
        .version(version)
        .headers(headers::from_environment(env))
        .body(env.body().clone())
        .server_params(env.server())
        .cookies(env.cookies())
        .uploaded_files(files::from_environment(env));

    if method == Method::Post.as_str() && env.has_form_body() {
        builder = builder.parsed_body(Some(ParsedBody::Form(env.post().clone())));
    }

    let request = builder.build(uri)?;
    debug!(
        method,
        uri = %request.uri(),
        version,
        "Created server request from environment"
    );
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Error, HttpMessage, Params};
    use serde_json::json;

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("HTTP_HOST", "test.com"),
            ("REQUEST_METHOD", "GET"),
            ("REQUEST_URI", "/path/123?q=abc"),
            ("QUERY_STRING", "q=abc"),
            ("REQUEST_SCHEME", "http"),
            ("SERVER_PORT", "1111"),
        ]
    }

    #[test]
    fn test_from_environment() {
        let env = Environment::builder().server(base()).build();
        let request = from_environment(&env).unwrap();

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.uri().to_string(), "http://test.com:1111/path/123?q=abc");
        assert_eq!(request.query_params().get("q"), Some(&json!("abc")));
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("host"), ["test.com"]);
        assert_eq!(request.protocol_version(), Version::Http11);
        assert_eq!(request.server_params().len(), 6);
        assert!(request.cookie_params().is_empty());
        assert!(request.uploaded_files().is_empty());
    }

    #[test]
    fn test_protocol_version() {
        let env = Environment::builder()
            .server(base())
            .var("SERVER_PROTOCOL", "HTTP/2.0")
            .build();
        assert_eq!(from_environment(&env).unwrap().protocol_version(), Version::Http20);

        let env = Environment::builder()
            .server(base())
            .var("SERVER_PROTOCOL", "HTTP/3")
            .build();
        assert!(matches!(from_environment(&env), Err(Error::InvalidVersion(_))));
    }

    #[test]
    fn test_missing_method_defaults_to_get() {
        let env = Environment::builder().var("REQUEST_URI", "/").build();
        assert_eq!(from_environment(&env).unwrap().method(), Method::Get);
    }

    #[test]
    fn test_unsupported_method() {
        let env = Environment::builder()
            .server(base())
            .var("REQUEST_METHOD", "HEAD")
            .build();
        assert!(matches!(from_environment(&env), Err(Error::InvalidMethod(_))));
    }

    #[test]
    fn test_form_post_uses_post_fields() {
        let mut post = Params::new();
        post.insert("name".to_string(), json!("from-gateway"));

        let env = Environment::builder()
            .server(base())
            .var("REQUEST_METHOD", "POST")
            .var("CONTENT_TYPE", "multipart/form-data; boundary=xyz")
            .body("--xyz raw multipart--")
            .post(post.clone())
            .build();

        let request = from_environment(&env).unwrap();
        assert_eq!(request.parsed_body(), Some(&ParsedBody::Form(post)));
    }

    #[test]
    fn test_json_post_parses_body() {
        let env = Environment::builder()
            .server(base())
            .var("REQUEST_METHOD", "POST")
            .var("CONTENT_TYPE", "application/json")
            .body(r#"{"id":7}"#)
            .build();

        let request = from_environment(&env).unwrap();
        assert_eq!(request.parsed_body(), Some(&ParsedBody::Json(json!({"id": 7}))));
    }

    #[test]
    fn test_cookies_and_files() {
        let env = Environment::builder()
            .server(base())
            .cookies([("session", "abc")])
            .files(json!({"doc": {"tmp_name": "/tmp/php1", "name": "a.txt", "error": 0}}))
            .build();

        let request = from_environment(&env).unwrap();
        assert_eq!(request.cookie_params().get("session").unwrap(), "abc");
        assert_eq!(request.uploaded_files()["doc"].files().len(), 1);
    }
}
