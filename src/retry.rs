//! Retry classification for service responses.
//!
//! A [`RetryPolicy`] looks at the status and the fully buffered body of a
//! response and decides whether the call succeeded, failed for good, or
//! should be sent again. [`DefaultRetryPolicy`] implements the AWS JSON
//! policy: throttling and server errors are transient, everything else at
//! or above 400 is the caller's problem.

use std::time::Duration;

use reqwest::StatusCode;

use crate::{AwsError, ServiceError};

/// Error kind AWS uses to signal rate limiting.
pub const THROTTLING: &str = "Throttling";

/// Outcome of classifying one response.
#[derive(Debug)]
pub enum RetryDecision {
    /// Return the body to the caller.
    Success,
    /// Stop and report this error.
    Fail(AwsError),
    /// Send the same signed request again, if budget remains.
    Retry(Option<ServiceError>),
}

/// Decides, from status and raw body, what happens to a response.
pub trait RetryPolicy: Send + Sync {
    fn classify(&self, status: StatusCode, body: &[u8]) -> RetryDecision;
}

impl<F> RetryPolicy for F
where
    F: Fn(StatusCode, &[u8]) -> RetryDecision + Send + Sync,
{
    fn classify(&self, status: StatusCode, body: &[u8]) -> RetryDecision {
        self(status, body)
    }
}

/// Retries throttling at any failure status and any status of 500 or more.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DefaultRetryPolicy {
    throttling_kind: String,
}

impl Default for DefaultRetryPolicy {
    fn default() -> Self {
        Self::with_throttling_kind(THROTTLING)
    }
}

impl DefaultRetryPolicy {
    /// Uses a different throttling sentinel, e.g. a DynamoDB exception name.
    pub fn with_throttling_kind(kind: impl Into<String>) -> Self {
        Self {
            throttling_kind: kind.into(),
        }
    }

    pub fn throttling_kind(&self) -> &str {
        &self.throttling_kind
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    fn classify(&self, status: StatusCode, body: &[u8]) -> RetryDecision {
        if status.as_u16() < 400 {
            return RetryDecision::Success;
        }

        let error = match decode_service_error(status, body) {
            Ok(error) => error,
            Err(err) => return RetryDecision::Fail(err),
        };

        if error.kind == self.throttling_kind || status.is_server_error() {
            RetryDecision::Retry(Some(error))
        } else {
            RetryDecision::Fail(AwsError::Service(error))
        }
    }
}

/// Decodes a `{"__type", "message"}` error document.
///
/// Any body that does not have that shape is [`AwsError::MalformedErrorBody`].
pub fn decode_service_error(status: StatusCode, body: &[u8]) -> Result<ServiceError, AwsError> {
    serde_json::from_slice::<ServiceError>(body)
        .map(|error| error.with_status(status.as_u16()))
        .map_err(|err| AwsError::MalformedErrorBody {
            status: status.as_u16(),
            body: String::from_utf8_lossy(body).into_owned(),
            reason: err.to_string(),
        })
}

/// Wait before the retry that follows attempt `attempt` (1-based): `base × 2^attempt`.
pub fn backoff_delay(base: Duration, attempt: usize) -> Duration {
    let exp = attempt.min(20) as u32;
    base.saturating_mul(1u32 << exp)
}
