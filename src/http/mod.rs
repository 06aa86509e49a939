//! HTTP protocol layer module
//!
//! Response builders, body handling and content negotiation helpers shared
//! by the pipeline stages.

pub mod body;
pub mod cache;
pub mod mime;
pub mod response;

pub use response::{
    build_304_response, build_file_response, empty_response, json_response, text_response,
};
