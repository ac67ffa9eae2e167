//! HTTP error mapping
//!
//! Every failure leaving a handler goes through [`ApiError`], which decides
//! the status code, the `{"error": ..}` body and the log level.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::DiligenceError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("No documents uploaded")]
    NoDocuments,

    #[error("{message}")]
    UnreadableDocument { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    #[inline]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } | Self::NoDocuments => StatusCode::BAD_REQUEST,
            Self::UnreadableDocument { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log the error with appropriate level
    #[inline]
    pub fn log(&self) {
        match self {
            Self::BadRequest { .. } | Self::NoDocuments | Self::UnreadableDocument { .. } => {
                warn!("Client error: {}", self);
            }
            Self::ServiceUnavailable { .. } => {
                error!("Dependency error: {}", self);
            }
            Self::Internal { .. } => {
                error!("Server error: {}", self);
            }
        }
    }
}

impl From<DiligenceError> for ApiError {
    fn from(error: DiligenceError) -> Self {
        match error {
            DiligenceError::NoDocuments => Self::NoDocuments,
            DiligenceError::InvalidInput(message) | DiligenceError::Config(message) => {
                Self::BadRequest { message }
            }
            DiligenceError::Extraction(message) => Self::UnreadableDocument { message },
            DiligenceError::Embedding(message) | DiligenceError::Index(message) => {
                Self::ServiceUnavailable { message }
            }
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
