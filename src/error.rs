use std::fmt;

use serde::Deserialize;

/// Kind reported once the retry budget of a call is consumed.
pub const EXCEEDED_MAX_RETRIES: &str = "ExceededMaxRetries";

const EXCEEDED_MAX_RETRIES_MESSAGE: &str =
    "The maximum number of retries for this request was exceeded.";

/// Error document returned by AWS JSON services.
///
/// Two service errors are considered equal when their `kind` matches;
/// the message and status are diagnostic only.
#[derive(Clone, Debug, Deserialize)]
pub struct ServiceError {
    /// Error type, e.g. `"ResourceNotFoundException"` or `"Throttling"`.
    #[serde(rename = "__type")]
    pub kind: String,
    /// Human readable message from the service.
    #[serde(default, alias = "Message")]
    pub message: String,
    /// HTTP status the error arrived with.
    #[serde(skip)]
    pub status: u16,
}

impl ServiceError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            status: 0,
        }
    }

    pub(crate) fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

impl PartialEq for ServiceError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for ServiceError {}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ServiceError {}

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum AwsError {
    /// Missing or invalid credentials, region or endpoint.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Network, TLS or deadline failure before a response was obtained.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Failure status whose body is not a service error document.
    #[error("malformed error body (http {status}): {reason}; body: {body}")]
    MalformedErrorBody {
        status: u16,
        body: String,
        reason: String,
    },
    /// Non-retryable error document returned by the service.
    #[error("{0}")]
    Service(ServiceError),
    /// Retry budget consumed without success or a permanent failure.
    #[error("ExceededMaxRetries: The maximum number of retries for this request was exceeded.")]
    RetriesExhausted {
        /// Number of attempts that were sent.
        attempts: usize,
        /// Last retryable error observed, kept for diagnostics only.
        last: Option<ServiceError>,
    },
    /// Success body that does not match the expected operation output.
    #[error("decode error: {0}")]
    Decode(String),
}

impl AwsError {
    /// Kind string callers can switch on regardless of the failure path.
    pub fn kind(&self) -> &str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::Transport(_) => "TransportError",
            Self::MalformedErrorBody { .. } => "MalformedErrorBody",
            Self::Service(err) => &err.kind,
            Self::RetriesExhausted { .. } => EXCEEDED_MAX_RETRIES,
            Self::Decode(_) => "DecodeError",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Configuration(message) | Self::Decode(message) => message.clone(),
            Self::Transport(err) => err.to_string(),
            Self::MalformedErrorBody { reason, .. } => reason.clone(),
            Self::Service(err) => err.message.clone(),
            Self::RetriesExhausted { .. } => EXCEEDED_MAX_RETRIES_MESSAGE.to_owned(),
        }
    }

    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    /// Returns the decoded service error, if this is one.
    pub fn as_service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ServiceError> for AwsError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{AwsError, ServiceError, EXCEEDED_MAX_RETRIES};

    #[test]
    fn service_error_decodes_type_and_message() {
        let err: ServiceError =
            serde_json::from_str(r#"{"__type":"NotFound","message":"Could not find something"}"#)
                .expect("valid error document");
        assert_eq!(err.kind, "NotFound");
        assert_eq!(err.message, "Could not find something");
        assert_eq!(err.to_string(), "NotFound: Could not find something");
    }

    #[test]
    fn service_error_accepts_capitalized_message() {
        let err: ServiceError =
            serde_json::from_str(r#"{"__type":"ValidationException","Message":"bad"}"#)
                .expect("valid error document");
        assert_eq!(err.message, "bad");
    }

    #[test]
    fn service_errors_compare_by_kind_only() {
        assert_eq!(
            ServiceError::new("Throttling", "slow down"),
            ServiceError::new("Throttling", "rate exceeded").with_status(400)
        );
        assert_ne!(
            ServiceError::new("Throttling", "x"),
            ServiceError::new("NotFound", "x")
        );
    }

    #[test]
    fn exhausted_kind_is_sentinel_even_with_last_error() {
        let err = AwsError::RetriesExhausted {
            attempts: 5,
            last: Some(ServiceError::new("Throttling", "You have been throttled")),
        };
        assert_eq!(err.kind(), EXCEEDED_MAX_RETRIES);
        assert_eq!(
            err.message(),
            "The maximum number of retries for this request was exceeded."
        );
        assert!(err.is_retries_exhausted());
        assert!(err.as_service_error().is_none());
    }

    #[test]
    fn service_variant_exposes_provider_kind() {
        let err = AwsError::from(ServiceError::new("NotFound", "gone"));
        assert_eq!(err.kind(), "NotFound");
        assert_eq!(err.message(), "gone");
        assert_eq!(err.to_string(), "NotFound: gone");
    }
}
