// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Error Handling
//!
//! A single error type for the HTTP-facing layer. Every variant maps to one
//! status code and one JSON body shape so handlers never build error
//! responses by hand.

use crate::constants::messages;
use crate::metrics::MetricsError;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;
use warp::http::StatusCode;
use warp::Reply;

/// Errors surfaced to API callers
#[derive(Debug, Error)]
pub enum ApiError {
    /// A field failed validation
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// Activity kind missing or not one of the recognized kinds
    #[error("{0}")]
    InvalidActivityKind(String),

    #[error("{}", messages::DURATION_NOT_POSITIVE)]
    InvalidDuration,

    #[error("{}", messages::DISTANCE_NEGATIVE)]
    InvalidDistance,

    /// Metrics period token not recognized
    #[error("{}", messages::INVALID_PERIOD)]
    InvalidPeriod,

    #[error("{}", messages::AUTH_REQUIRED)]
    Unauthenticated,

    /// Caller tried to act on a record owned by someone else
    #[error("{}", messages::PERMISSION_DENIED)]
    Forbidden,

    #[error("{}", messages::NOT_FOUND)]
    NotFound,

    /// Anything the caller cannot fix; details are logged, not returned
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Shorthand for a field validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. }
            | ApiError::InvalidActivityKind(_)
            | ApiError::InvalidDuration
            | ApiError::InvalidDistance
            | ApiError::InvalidPeriod => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body for this error
    ///
    /// Field errors are keyed by field name with a list of messages.
    pub fn body(&self) -> Value {
        match self {
            ApiError::Validation { field, message } => json!({ field.as_str(): [message] }),
            ApiError::InvalidActivityKind(message) => json!({ "activity_type": [message] }),
            ApiError::InvalidDuration => json!({ "duration": [self.to_string()] }),
            ApiError::InvalidDistance => json!({ "distance": [self.to_string()] }),
            ApiError::Internal(_) => json!({ "error": messages::INTERNAL_ERROR }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

impl From<MetricsError> for ApiError {
    fn from(err: MetricsError) -> Self {
        match err {
            MetricsError::InvalidPeriod(_) => ApiError::InvalidPeriod,
            MetricsError::UnknownUser(_) => ApiError::NotFound,
            err @ MetricsError::Overflow(_) => ApiError::Internal(anyhow::Error::new(err)),
            MetricsError::Store(e) => ApiError::Internal(e),
        }
    }
}

impl warp::reject::Reject for ApiError {}

impl ApiError {
    /// Render as an HTTP response, logging internal failures
    pub fn to_response(&self) -> warp::reply::Response {
        if let ApiError::Internal(e) = self {
            error!("Internal error: {:#}", e);
        }
        warp::reply::with_status(warp::reply::json(&self.body()), self.status_code()).into_response()
    }
}

impl warp::Reply for ApiError {
    fn into_response(self) -> warp::reply::Response {
        self.to_response()
    }
}
