//! Integration tests for copy-on-write message semantics

use httpmessage::http::{
    Body, Headers, HttpMessage, MemoryStream, Request, RequestMessage, Response, Stream, Uri,
};

#[test]
fn test_request_chain_leaves_every_step_intact() {
    let first = Request::new("GET", "http://test.com/a", Headers::new(), ()).unwrap();
    let second = first.with_header("Accept", "text/html").unwrap();
    let third = second.with_added_header("Accept", "application/json").unwrap();
    let fourth = third.without_header("Accept").with_method("POST").unwrap();

    assert!(!first.has_header("accept"));
    assert_eq!(second.header("accept"), ["text/html"]);
    assert_eq!(third.header("accept"), ["text/html", "application/json"]);
    assert!(!fourth.has_header("accept"));
    assert_eq!(third.method().as_str(), "GET");
    assert_eq!(fourth.method().as_str(), "POST");
}

#[test]
fn test_uri_changes_do_not_leak() {
    let request = Request::new("GET", "http://test.com:8080/a?b=c", Headers::new(), ()).unwrap();
    let uri = request.uri().with_port(Some(9090)).unwrap().with_path("/z").unwrap();
    let moved = request.with_uri(uri, true);

    assert_eq!(request.uri().to_string(), "http://test.com:8080/a?b=c");
    assert_eq!(moved.uri().to_string(), "http://test.com:9090/z?b=c");
    assert_eq!(moved.header("host"), ["test.com"]);
}

#[test]
fn test_uri_round_trip() {
    let uri = Uri::from_parts(httpmessage::http::uri::UriParts {
        scheme: "http",
        host: "Test.COM",
        port: Some(1111),
        path: "/a/b",
        query: "q=1",
        fragment: "f",
        ..Default::default()
    })
    .unwrap();

    assert_eq!(uri.to_string(), "http://test.com:1111/a/b?q=1#f");
    let reparsed: Uri = uri.to_string().parse().unwrap();
    assert_eq!(reparsed, uri);
}

#[test]
fn test_body_stream_is_shared_between_copies() {
    let body = Body::from_stream(MemoryStream::from_bytes("shared"));
    let response = Response::new(200, Headers::new(), body.clone()).unwrap();
    let copy = response.with_header("X-Copy", "1").unwrap();

    assert!(copy.body().ptr_eq(response.body()));
    assert_eq!(copy.body().to_string_lossy(), "shared");

    let replaced = copy.with_body("new");
    assert!(!replaced.body().ptr_eq(response.body()));
    assert_eq!(response.body().to_string_lossy(), "shared");
}

#[test]
fn test_detached_body_reads_as_empty() {
    let mut stream = MemoryStream::from_bytes("data");
    assert!(stream.detach().is_some());
    assert!(stream.read(4).is_err());

    let body = Body::from_stream(stream);
    assert_eq!(body.to_string_lossy(), "");
}
