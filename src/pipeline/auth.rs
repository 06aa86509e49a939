//! Pluggable authorization check

use super::context::RequestContext;

/// Decides whether a request may proceed past the authentication stage
pub trait Authorizer: Send + Sync {
    fn authorize(&self, ctx: &RequestContext) -> bool;
}

/// Lets every request through
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _ctx: &RequestContext) -> bool {
        true
    }
}

impl<F> Authorizer for F
where
    F: Fn(&RequestContext) -> bool + Send + Sync,
{
    fn authorize(&self, ctx: &RequestContext) -> bool {
        self(ctx)
    }
}
