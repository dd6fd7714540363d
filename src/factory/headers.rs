//! Request headers from server variables

use crate::environment::Environment;
use crate::http::Headers;
use indexmap::IndexMap;

/// Server variables that carry headers without the `HTTP_` prefix
const SPECIAL_HEADERS: &[&str] = &[
    "CONTENT_TYPE",
    "CONTENT_LENGTH",
    "PHP_AUTH_USER",
    "PHP_AUTH_PW",
    "PHP_AUTH_DIGEST",
    "AUTH_TYPE",
];

const REDIRECT_PREFIX: &str = "REDIRECT_";

/// Build the request headers
pub fn from_environment(env: &Environment) -> Headers {
    Headers::from_raw(resolve(env.server()))
}

/// Select header variables
///
/// `REDIRECT_`-prefixed variables, set by rewrites, are used without the
/// prefix unless the unprefixed variable is also present.
fn resolve(server: &IndexMap<String, String>) -> Vec<(&str, &str)> {
    server
        .iter()
        .filter_map(|(name, value)| {
            let name = match name.strip_prefix(REDIRECT_PREFIX) {
                Some(stripped) if server.contains_key(stripped) => return None,
                Some(stripped) => stripped,
                None => name.as_str(),
            };
            let is_header = name.starts_with("HTTP_") || SPECIAL_HEADERS.contains(&name);
            is_header.then_some((name, value.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMessage;

    fn headers(vars: &[(&str, &str)]) -> Headers {
        from_environment(&Environment::builder().server(vars.iter().copied()).build())
    }

    #[test]
    fn test_selects_header_variables() {
        let headers = headers(&[
            ("HTTP_HOST", "test.com"),
            ("HTTP_ACCEPT", "text/html, application/json"),
            ("CONTENT_TYPE", "text/plain"),
            ("CONTENT_LENGTH", "12"),
            ("SERVER_NAME", "ignored"),
            ("REQUEST_METHOD", "GET"),
        ]);

        assert_eq!(headers.get("host"), ["test.com"]);
        assert_eq!(headers.get("accept"), ["text/html", "application/json"]);
        assert_eq!(headers.get("content-type"), ["text/plain"]);
        assert_eq!(headers.get("content-length"), ["12"]);
        assert!(!headers.contains("server-name"));
        assert_eq!(headers.len(), 4);
    }

    #[test]
    fn test_auth_variables() {
        let headers = headers(&[("PHP_AUTH_USER", "user"), ("AUTH_TYPE", "Basic")]);
        assert_eq!(headers.get("php-auth-user"), ["user"]);
        assert_eq!(headers.get("auth-type"), ["Basic"]);
    }

    #[test]
    fn test_redirect_precedence() {
        let resolved = headers(&[("HTTP_HOST", "plain"), ("REDIRECT_HTTP_HOST", "redirected")]);
        assert_eq!(resolved.get("host"), ["plain"]);

        let resolved = headers(&[
            ("REDIRECT_HTTP_X_ORIGINAL", "redirected"),
            ("REDIRECT_STATUS", "200"),
        ]);
        assert_eq!(resolved.get("x-original"), ["redirected"]);
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn test_feeds_message() {
        let message = crate::http::Message::new(
            headers(&[("HTTP_USER_AGENT", "Mozilla/5.0 (X11, Linux)")]),
            (),
            Default::default(),
        );
        assert_eq!(message.header("User-Agent"), ["Mozilla/5.0 (X11, Linux)"]);
    }
}
