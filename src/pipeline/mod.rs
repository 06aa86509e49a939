//! Request pipeline
//!
//! Every stage returns a [`Flow`]: forward to the next stage, finalize the
//! response, or fail into the global error stage. Exactly one stage
//! finalizes each request.

mod auth;
mod context;
mod driver;
mod error;
mod flow;

pub use auth::{AllowAll, Authorizer};
pub use context::{RequestContext, UploadedFile};
pub use driver::Pipeline;
pub use error::PipelineError;
pub use flow::{report, Flow};
