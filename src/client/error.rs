//! Errors returned by the API client

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::transport::TransportError;

/// A single field-level problem reported with a 422 response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationErrorMessage {
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for ValidationErrorMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\t[{}:{}] {}", self.resource, self.field, self.message)
    }
}

/// Errors that can occur when talking to the API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Sending the request failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Building the request or reading the response body failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint URL could not be built
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither a token nor a username was configured
    #[error("Either username or token must be given")]
    MissingCredentials,

    /// 400 Bad Request
    #[error("{message}")]
    BadRequest { message: String },

    /// 404 Not Found
    #[error("Not found")]
    NotFound,

    /// 422 Unprocessable Entity
    #[error("{message}\n{}", format_validation_errors(.errors))]
    Validation {
        message: String,
        errors: Vec<ValidationErrorMessage>,
    },

    /// 429 Too Many Requests
    #[error(
        "Rate limit exceeded: from {limit} requests {remaining} are remaining (reset at {reset})"
    )]
    RateLimited {
        limit: u64,
        remaining: u64,
        reset: DateTime<Utc>,
    },

    /// A 429 response without usable rate limit headers
    #[error("Invalid rate limit header: {0}")]
    InvalidRateLimitHeader(String),

    /// Any other status
    #[error("Unexpected status code ({status}) received; expected {expected}")]
    UnexpectedStatus {
        status: StatusCode,
        expected: StatusCode,
    },
}

fn format_validation_errors(errors: &[ValidationErrorMessage]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
