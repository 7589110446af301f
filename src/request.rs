use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::Serialize;

use crate::retry::RetryPolicy;
use crate::{AwsError, Result};

/// Header naming the API operation for JSON-protocol services.
pub const TARGET_HEADER: &str = "x-amz-target";
/// Content type spoken by Kinesis and DynamoDB.
pub const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Unsigned outbound request built by a service operation.
///
/// Header names are case-insensitive and unique: setting a header twice
/// replaces the first value. Invalid header names or values are reported
/// as [`AwsError::Configuration`] when the request is signed.
#[derive(Clone)]
pub struct AwsRequest {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
    pub(crate) service: Option<String>,
    pub(crate) retry_policy: Option<Arc<dyn RetryPolicy>>,
    pub(crate) max_attempts: Option<usize>,
    pub(crate) invalid: Option<String>,
}

impl fmt::Debug for AwsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("service", &self.service)
            .field("retry_policy", &self.retry_policy.as_ref().map(|_| "<custom>"))
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl AwsRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            service: None,
            retry_policy: None,
            max_attempts: None,
            invalid: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Builds a JSON-protocol `POST` with target and content-type set.
    ///
    /// `target` is the full operation name, e.g. `Kinesis_20131202.PutRecord`.
    pub fn json<T: Serialize + ?Sized>(
        url: impl Into<String>,
        target: &str,
        payload: &T,
    ) -> Result<Self> {
        let body = serde_json::to_vec(payload)
            .map_err(|err| AwsError::Decode(format!("could not encode {target} input: {err}")))?;
        Ok(Self::post(url)
            .target(target)
            .content_type(JSON_CONTENT_TYPE)
            .body(body))
    }

    /// Sets a header, replacing any previous value under the same name.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let name = match HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                self.invalid.get_or_insert_with(|| format!("invalid header name '{name}'"));
                return self;
            }
        };
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => {
                self.invalid
                    .get_or_insert_with(|| format!("invalid value for header '{name}'"));
            }
        }
        self
    }

    pub fn target(self, target: &str) -> Self {
        self.header(TARGET_HEADER, target)
    }

    pub fn content_type(self, content_type: &str) -> Self {
        self.header(CONTENT_TYPE.as_str(), content_type)
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Names the signing service explicitly instead of inferring it from the host.
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Overrides the client's retry policy for this call only.
    pub fn retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry_policy = Some(Arc::new(policy));
        self
    }

    /// Overrides the client's attempt ceiling for this call only.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }
}

/// Request after signing. Read-only; every attempt of a call sends it verbatim.
#[derive(Clone, Debug)]
pub struct SignedRequest {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
}

impl SignedRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub(crate) fn to_reqwest(&self, http: &reqwest::Client) -> reqwest::RequestBuilder {
        http.request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone())
            .body(self.body.clone())
    }
}
