//! Stub REST server
//!
//! Users/products stub endpoints, a static file mount and a single-file
//! upload route, all served through one ordered request pipeline.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod pipeline;
pub mod routing;
pub mod server;
