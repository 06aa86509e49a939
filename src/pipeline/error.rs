//! Failures a pipeline stage can raise

use hyper::StatusCode;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The authorizer denied the request
    #[error("{0}")]
    Authentication(String),

    /// Nothing upstream finalized the request
    #[error("Route Not Found")]
    RouteNotFound,

    /// A captured route parameter is not valid percent-encoded UTF-8
    #[error("Failed to decode param '{0}'")]
    ParamDecode(String),

    /// Multipart decoding failed on the upload route
    #[error("{0}")]
    UploadDecode(String),

    #[error("request entity too large")]
    PayloadTooLarge,

    /// Body did not parse as its declared content type
    #[error("{0}")]
    MalformedBody(String),

    #[error("{0}")]
    Unclassified(String),
}

impl PipelineError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::ParamDecode(_) | Self::UploadDecode(_) | Self::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Title shown in the error body, chosen from the status alone
    pub fn title(&self) -> &'static str {
        let status = self.status();
        if status == StatusCode::UNAUTHORIZED {
            "Not Authorized"
        } else if status == StatusCode::NOT_FOUND {
            "Not Found"
        } else {
            "Server Error"
        }
    }
}

impl From<multer::Error> for PipelineError {
    fn from(err: multer::Error) -> Self {
        Self::UploadDecode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_title() {
        let auth = PipelineError::Authentication("Authentication Failed".into());
        assert_eq!(auth.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(auth.title(), "Not Authorized");
        assert_eq!(auth.to_string(), "Authentication Failed");

        assert_eq!(PipelineError::RouteNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(PipelineError::RouteNotFound.title(), "Not Found");
        assert_eq!(PipelineError::RouteNotFound.to_string(), "Route Not Found");

        let boom = PipelineError::Unclassified("boom".into());
        assert_eq!(boom.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(boom.title(), "Server Error");
    }

    #[test]
    fn test_other_statuses_use_server_error_title() {
        let too_large = PipelineError::PayloadTooLarge;
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(too_large.title(), "Server Error");
        assert_eq!(PipelineError::MalformedBody("bad".into()).title(), "Server Error");

        let param = PipelineError::ParamDecode("%ff".into());
        assert_eq!(param.status(), StatusCode::BAD_REQUEST);
        assert_eq!(param.to_string(), "Failed to decode param '%ff'");
    }
}
