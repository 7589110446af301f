//! `awsjson-http` signs and dispatches requests to AWS JSON-protocol services.
//!
//! The core is [`AwsClient::send`]: it signs a request once with
//! Signature Version 4, sends it, classifies the response through a
//! [`RetryPolicy`], and retries throttling and server errors with
//! exponential backoff. Callers get either the raw success body or a
//! single [`AwsError`] whose [`kind`](AwsError::kind) they can match on.
//!
//! Service bindings built on top:
//! - [`kinesis::KinesisService`]

mod canonical;
mod client;
mod credentials;
mod error;
mod options;
mod request;
mod signer;

pub mod kinesis;
pub mod region;
pub mod retry;

pub use client::AwsClient;
pub use credentials::Credentials;
pub use error::{AwsError, ServiceError, EXCEEDED_MAX_RETRIES};
pub use options::ClientOptions;
pub use region::{Region, Service};
pub use request::{AwsRequest, SignedRequest, JSON_CONTENT_TYPE, TARGET_HEADER};
pub use retry::{DefaultRetryPolicy, RetryDecision, RetryPolicy};
pub use signer::{Scope, Signer};

pub type Result<T> = std::result::Result<T, AwsError>;
