//! HTTP API Module
//!
//! Provides the REST surface over the document store.

mod http;

pub use http::HttpServer;

#[cfg(test)]
pub(crate) use http::spawn_test_server;
