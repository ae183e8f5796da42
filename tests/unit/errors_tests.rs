/*!
 * Error taxonomy tests
 */

use anyhow::Context;

use kwtrans::errors::{AppError, JobError, ProviderError, TranslationError};
use kwtrans::JobStatus;

#[test]
fn test_fromStatus_shouldClassifyHttpCodes() {
    assert!(matches!(
        ProviderError::from_status(429, "slow down".into()),
        ProviderError::RateLimitExceeded(_)
    ));
    assert!(matches!(
        ProviderError::from_status(401, "bad key".into()),
        ProviderError::AuthenticationError(_)
    ));
    assert!(matches!(
        ProviderError::from_status(403, "forbidden".into()),
        ProviderError::AuthenticationError(_)
    ));
    assert!(matches!(
        ProviderError::from_status(502, "bad gateway".into()),
        ProviderError::ApiError { status_code: 502, .. }
    ));
}

#[test]
fn test_translationError_retryability() {
    let auth: TranslationError = ProviderError::AuthenticationError("bad key".into()).into();
    let limited: TranslationError = ProviderError::RateLimitExceeded("later".into()).into();

    assert!(!auth.is_retryable());
    assert!(limited.is_retryable());
    assert!(limited.is_rate_limited());
    assert!(TranslationError::MalformedResponse("prose".into()).is_retryable());
    assert!(TranslationError::Timeout(60).is_retryable());
    assert!(!TranslationError::Timeout(60).is_rate_limited());
}

#[test]
fn test_jobError_messages() {
    let err = JobError::NotClaimable {
        job_id: "abc".into(),
        status: JobStatus::Completed,
    };
    assert_eq!(err.to_string(), "Job abc is completed and cannot be processed");
    assert_eq!(JobError::EmptySubmission.to_string(), "Submission contains no keywords");
}

#[test]
fn test_jobError_shouldSurviveContextWrapping() {
    let result: anyhow::Result<()> = Err(JobError::Closed("abc".into())).context("Failed to store chunk 1/1");
    let err = result.unwrap_err();

    assert!(matches!(err.downcast_ref::<JobError>(), Some(JobError::Closed(id)) if id == "abc"));
    assert_eq!(format!("{:#}", err), "Failed to store chunk 1/1: Job abc no longer accepts items");
}

#[test]
fn test_appError_conversions() {
    let app: AppError = JobError::NotFound("x".into()).into();
    assert_eq!(app.to_string(), "Job error: Job not found: x");

    let app: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(app, AppError::File(_)));
}
