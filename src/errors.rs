/*!
 * Error types for the kwtrans application.
 *
 * This module contains custom error types for the translation capability
 * and the job pipeline, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

use crate::database::models::JobStatus;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Map a non-success HTTP status and body onto the error taxonomy
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            429 => Self::RateLimitExceeded(message),
            401 | 403 => Self::AuthenticationError(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

/// Errors that can occur while translating a single keyword
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The model answered, but not with exactly two variants
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// The call did not finish within the request timeout
    #[error("Translation request timed out after {0} seconds")]
    Timeout(u64),
}

impl TranslationError {
    /// Whether the failure was a rate-limit signal from the provider
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Provider(ProviderError::RateLimitExceeded(_)))
    }

    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Provider(ProviderError::AuthenticationError(_)))
    }
}

/// Business-level errors raised by the job pipeline
#[derive(Error, Debug)]
pub enum JobError {
    /// No job with the given id exists
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The job exists but cannot be claimed in its current state
    #[error("Job {job_id} is {status} and cannot be processed")]
    NotClaimable {
        /// Job identifier
        job_id: String,
        /// Status observed when the claim was attempted
        status: JobStatus,
    },

    /// Items may only be appended while the job is still queued and unsealed
    #[error("Job {0} no longer accepts items")]
    Closed(String),

    /// A submission without a single keyword row
    #[error("Submission contains no keywords")]
    EmptySubmission,

    /// A keyword row whose keyword is empty or only whitespace
    #[error("Item {0} has a blank keyword")]
    BlankKeyword(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from the job pipeline
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
