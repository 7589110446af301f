use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::{
    region::DEFAULT_REGION,
    retry::{backoff_delay, DefaultRetryPolicy, RetryDecision, RetryPolicy},
    AwsError, AwsRequest, ClientOptions, Credentials, Result, SignedRequest, Signer,
};

/// Signs AWS requests and dispatches them with retry and backoff.
///
/// The client holds no per-call state: every [`AwsClient::send`] owns its
/// signed request and attempt counter, so one client can serve any number
/// of concurrent calls.
#[derive(Clone)]
pub struct AwsClient {
    http: reqwest::Client,
    signer: Signer,
    options: ClientOptions,
    retry_policy: Arc<dyn RetryPolicy>,
}

impl fmt::Debug for AwsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsClient")
            .field("signer", &self.signer)
            .field("options", &self.options)
            .field("retry_policy", &"<dyn RetryPolicy>")
            .finish()
    }
}

impl AwsClient {
    /// Creates a client signing with `credentials` in `region`.
    pub fn new(credentials: Credentials, region: impl Into<String>) -> Self {
        Self::from_signer(Signer::new(Some(credentials), region))
    }

    /// Creates a client around an existing signer.
    ///
    /// A signer without credentials is accepted; every send then fails
    /// with [`AwsError::Configuration`] before anything is transmitted.
    pub fn from_signer(signer: Signer) -> Self {
        Self {
            http: reqwest::Client::new(),
            signer,
            options: ClientOptions::default(),
            retry_policy: Arc::new(DefaultRetryPolicy::default()),
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN` (optional)
    /// - `AWS_REGION`, falling back to `AWS_DEFAULT_REGION`, then `us-east-1`
    pub fn from_env() -> Result<Self> {
        let credentials = Credentials::from_env()?;
        let region = ["AWS_REGION", "AWS_DEFAULT_REGION"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_owned());
        Ok(Self::new(credentials, region))
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Replaces the default retry policy for every call of this client.
    pub fn with_retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry_policy = Arc::new(policy);
        self
    }

    /// Uses a preconfigured `reqwest` client as transport.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn region(&self) -> &str {
        self.signer.region()
    }

    /// Signs `request` once and sends it until it succeeds, fails
    /// permanently, or runs out of attempts. Returns the raw success body.
    pub async fn send(&self, request: AwsRequest) -> Result<Vec<u8>> {
        let policy = request
            .retry_policy
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.retry_policy));
        let max_attempts = request
            .max_attempts
            .unwrap_or(self.options.max_attempts)
            .max(1);

        let signed = self.signer.sign(request)?;
        self.dispatch(&signed, &*policy, max_attempts).await
    }

    /// Sends `request` and decodes the success body as JSON.
    pub async fn send_json<O: DeserializeOwned>(&self, request: AwsRequest) -> Result<O> {
        let body = self.send(request).await?;
        serde_json::from_slice(&body).map_err(|err| {
            AwsError::Decode(format!(
                "invalid response JSON: {err}; body: {}",
                String::from_utf8_lossy(&body)
            ))
        })
    }

    async fn dispatch(
        &self,
        signed: &SignedRequest,
        policy: &dyn RetryPolicy,
        max_attempts: usize,
    ) -> Result<Vec<u8>> {
        let mut attempt = 1usize;
        loop {
            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, max_attempts, url = %signed.url(), "sending request");

            let last = match self.send_once(signed).await {
                Ok((status, body)) => match policy.classify(status, &body) {
                    RetryDecision::Success => return Ok(body),
                    RetryDecision::Fail(err) => return Err(err),
                    RetryDecision::Retry(last) => last,
                },
                Err(err) if err.is_timeout() && self.options.retry_timeouts => None,
                Err(err) => return Err(AwsError::Transport(err)),
            };

            if attempt >= max_attempts {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempts = attempt, "retry budget exhausted");

                return Err(AwsError::RetriesExhausted {
                    attempts: attempt,
                    last,
                });
            }

            self.wait_before_retry(attempt).await;
            attempt += 1;
        }
    }

    /// One attempt: transmit and buffer the whole body before classification.
    async fn send_once(
        &self,
        signed: &SignedRequest,
    ) -> std::result::Result<(StatusCode, Vec<u8>), reqwest::Error> {
        let response = signed
            .to_reqwest(&self.http)
            .timeout(Duration::from_millis(self.options.timeout_ms))
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok((status, body.to_vec()))
    }

    /// Waits `retry_backoff_ms × 2^attempt` before the next attempt.
    async fn wait_before_retry(&self, attempt: usize) {
        let delay = backoff_delay(Duration::from_millis(self.options.retry_backoff_ms), attempt);

        #[cfg(feature = "tracing")]
        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying request");

        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::AwsClient;
    use crate::{ClientOptions, Credentials};

    #[test]
    fn debug_redacts_secret_key() {
        let client = AwsClient::new(Credentials::new("AKID", "very-secret-key"), "us-east-1");
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("very-secret-key"));
    }

    #[test]
    fn defaults_follow_client_options() {
        let client = AwsClient::new(Credentials::new("AKID", "secret"), "eu-west-1");
        assert_eq!(client.options(), &ClientOptions::default());
        assert_eq!(client.options().max_attempts, 5);
        assert_eq!(client.options().retry_backoff_ms, 100);
        assert_eq!(client.region(), "eu-west-1");
    }
}
