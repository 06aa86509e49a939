//! Request handler module
//!
//! Terminal handlers and the stages that can finalize a request on their own:
//! the resource stubs, the static file stage and the upload sub-pipeline.

pub mod resources;
pub mod static_files;
pub mod upload;
