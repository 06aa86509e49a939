//! Stub handlers for the users and products resources
//!
//! None of these touch any state; they answer with fixed messages.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::http;
use crate::logger;
use crate::pipeline::RequestContext;

#[derive(Debug, Serialize)]
struct Message {
    msg: String,
}

fn message(msg: impl Into<String>) -> Response<Full<Bytes>> {
    http::json_response(StatusCode::OK, &Message { msg: msg.into() })
}

fn id(ctx: &RequestContext) -> &str {
    ctx.param("id").unwrap_or_default()
}

pub fn list_users(_ctx: &RequestContext) -> Response<Full<Bytes>> {
    message("All Users")
}

pub fn create_user(ctx: &RequestContext) -> Response<Full<Bytes>> {
    logger::log_info(&ctx.body.to_string());
    message("Create Users")
}

pub fn update_user(ctx: &RequestContext) -> Response<Full<Bytes>> {
    message(format!("Update Users Of {}", id(ctx)))
}

pub fn delete_user(ctx: &RequestContext) -> Response<Full<Bytes>> {
    message(format!("Delete Users Of {}", id(ctx)))
}

pub fn list_products(_ctx: &RequestContext) -> Response<Full<Bytes>> {
    message("Get Products")
}
