//! Stage outcomes and the global error stage

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use serde::Serialize;

use super::error::PipelineError;
use crate::http;

/// What a stage decided about the request
#[derive(Debug)]
pub enum Flow {
    /// Hand the request to the next stage
    Forward,
    /// The response is complete; later stages do not run
    Finalized(Response<Full<Bytes>>),
    /// Skip the remaining stages and report through the error stage
    Failed(PipelineError),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    title: &'a str,
    message: String,
}

/// Global error stage: always finalizes with `{ title, message }`
pub fn report(err: &PipelineError) -> Response<Full<Bytes>> {
    let body = ErrorBody {
        title: err.title(),
        message: err.to_string(),
    };
    http::json_response(err.status(), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::StatusCode;

    #[tokio::test]
    async fn test_report_not_found() {
        let resp = report(&PipelineError::RouteNotFound);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"title":"Not Found","message":"Route Not Found"}"#);
    }

    #[tokio::test]
    async fn test_report_unclassified() {
        let resp = report(&PipelineError::Unclassified("disk on fire".into()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"title":"Server Error","message":"disk on fire"}"#);
    }
}
