//! httpmessage - Immutable HTTP message model
//!
//! This crate provides value objects for HTTP requests, server requests,
//! responses, URIs, headers and uploaded files, plus factories that build a
//! server request from a CGI-style environment.

pub mod environment;
pub mod factory;
pub mod http;
