/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt transport timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of attempts per call, the first send included.
    pub max_attempts: usize,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub retry_backoff_ms: u64,
    /// Treat transport deadline expiry as retryable instead of fatal.
    pub retry_timeouts: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_attempts: 5,
            retry_backoff_ms: 100,
            retry_timeouts: false,
        }
    }
}
