//! Pipeline driver
//!
//! Runs the fixed stage order for one request:
//! access log → authentication → body parsing → static files → route
//! dispatch → not found, with the global error stage catching any failure.
//! The diagnostic HTTP log wraps the whole traversal.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::HeaderValue;
use hyper::{Request, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::auth::{AllowAll, Authorizer};
use super::context::RequestContext;
use super::error::PipelineError;
use super::flow::{self, Flow};
use crate::config::Config;
use crate::handler::{resources, static_files, upload};
use crate::http::body as request_body;
use crate::logger::{self, AccessLog, AccessLogEntry};
use crate::routing::{Endpoint, RouteTable};

/// Return from the enclosing stage runner unless the stage forwarded
macro_rules! forward {
    ($stage:expr) => {
        match $stage {
            Flow::Forward => {}
            outcome => return outcome,
        }
    };
}

pub struct Pipeline {
    config: Arc<Config>,
    routes: RouteTable,
    authorizer: Arc<dyn Authorizer>,
    access_log: Option<AccessLog>,
}

impl Pipeline {
    /// Pipeline with the standard routes and an authorizer that allows everything
    pub fn new(config: Arc<Config>) -> Self {
        let access_log = config
            .logging
            .access_log
            .then(|| AccessLog::new(&config.logging.access_log_file));
        Self {
            config,
            routes: RouteTable::standard(),
            authorizer: Arc::new(AllowAll),
            access_log,
        }
    }

    #[must_use]
    pub fn with_authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    pub const fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Run one request through every stage; always yields a finalized response
    pub async fn handle<B>(&self, req: Request<B>, peer: Option<SocketAddr>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let started = Instant::now();
        let (parts, body) = req.into_parts();

        let url = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
        let mut entry = AccessLogEntry::new(
            peer.map_or_else(|| "-".to_string(), |p| p.ip().to_string()),
            parts.method.to_string(),
            url.clone(),
        );
        entry.http_version = format!("{:?}", parts.version).trim_start_matches("HTTP/").to_string();

        let mut ctx = RequestContext::new(parts.method, url, parts.uri.path().to_string(), parts.headers);
        entry.referer = ctx.header(hyper::header::REFERER).map(str::to_owned);
        entry.user_agent = ctx.header(hyper::header::USER_AGENT).map(str::to_owned);

        self.log_access(&entry);

        let mut response = match self.run(&mut ctx, body).await {
            Flow::Finalized(resp) => resp,
            Flow::Failed(err) => flow::report(&err),
            // The not-found stage never forwards
            Flow::Forward => flow::report(&PipelineError::RouteNotFound),
        };
        if let Ok(server) = HeaderValue::from_str(&self.config.http.server_name) {
            response.headers_mut().insert(hyper::header::SERVER, server);
        }

        self.log_http(entry, &response, started);
        response
    }

    async fn run<B>(&self, ctx: &mut RequestContext, body: B) -> Flow
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        // Taken by the body parsers when they consume it
        let mut body = Some(body);
        forward!(self.authenticate(ctx));
        forward!(self.parse_body(ctx, &mut body).await);
        forward!(static_files::serve(ctx, &self.config.static_files).await);
        forward!(self.dispatch(ctx, body).await);
        Flow::Failed(PipelineError::RouteNotFound)
    }

    /// Access-log stage: fire-and-forget append
    fn log_access(&self, entry: &AccessLogEntry) {
        if let Some(log) = &self.access_log {
            // Not awaited; write errors are reported by the log itself
            drop(log.append(entry.request_line()));
        }
    }

    fn authenticate(&self, ctx: &RequestContext) -> Flow {
        if self.authorizer.authorize(ctx) {
            logger::log_debug("Authentication Successful");
            Flow::Forward
        } else {
            Flow::Failed(PipelineError::Authentication(
                "Authentication Failed".to_string(),
            ))
        }
    }

    /// Body-parsing stage; only JSON and URL-encoded bodies are read here
    async fn parse_body<B>(&self, ctx: &mut RequestContext, body: &mut Option<B>) -> Flow
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if !request_body::has_parser(ctx.content_type()) {
            return Flow::Forward;
        }
        let Some(body) = body.take() else {
            return Flow::Forward;
        };

        let limit = self.config.http.max_body_size;
        if let Err(err) = request_body::check_content_length(&ctx.headers, limit) {
            return Flow::Failed(err);
        }
        let raw = match request_body::collect_body(body, limit).await {
            Ok(raw) => raw,
            Err(err) => return Flow::Failed(err),
        };
        match request_body::parse_body(ctx.content_type(), &raw) {
            Ok(value) => {
                ctx.body = value;
                Flow::Forward
            }
            Err(err) => Flow::Failed(err),
        }
    }

    async fn dispatch<B>(&self, ctx: &mut RequestContext, body: Option<B>) -> Flow
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let Some(matched) = self.routes.resolve(&ctx.method, &ctx.path) else {
            return Flow::Forward;
        };
        ctx.params = match matched.decoded_params() {
            Ok(params) => params,
            Err(raw) => return Flow::Failed(PipelineError::ParamDecode(raw)),
        };

        let response = match matched.endpoint {
            Endpoint::ListUsers => resources::list_users(ctx),
            Endpoint::CreateUser => resources::create_user(ctx),
            Endpoint::UpdateUser => resources::update_user(ctx),
            Endpoint::DeleteUser => resources::delete_user(ctx),
            Endpoint::ListProducts => resources::list_products(ctx),
            Endpoint::Upload => upload::handle(ctx, &self.config.uploads, body).await,
        };
        Flow::Finalized(response)
    }

    /// Diagnostic HTTP log stage, written once the response is final
    fn log_http(&self, mut entry: AccessLogEntry, response: &Response<Full<Bytes>>, started: Instant) {
        if !self.config.logging.http_log {
            return;
        }
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default();
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_http(&entry, &self.config.logging.http_log_format);
    }
}
