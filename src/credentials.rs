use std::fmt;

use crate::{AwsError, Result};

/// AWS access key pair, optionally with a session token for temporary credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Reads credentials from the standard environment variables.
    ///
    /// Reads:
    /// - `AWS_ACCESS_KEY_ID`
    /// - `AWS_SECRET_ACCESS_KEY`
    /// - `AWS_SESSION_TOKEN` (optional)
    pub fn from_env() -> Result<Self> {
        let access_key_id = required_env("AWS_ACCESS_KEY_ID")?;
        let secret_access_key = required_env("AWS_SECRET_ACCESS_KEY")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub(crate) fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.access_key_id.trim().is_empty() {
            return Err(AwsError::Configuration("access key id is empty".to_owned()));
        }
        if self.access_key_id.contains('/') || self.access_key_id.contains(char::is_whitespace) {
            return Err(AwsError::Configuration(
                "access key id contains invalid characters".to_owned(),
            ));
        }
        if self.secret_access_key.trim().is_empty() {
            return Err(AwsError::Configuration(
                "secret access key is empty".to_owned(),
            ));
        }
        Ok(())
    }
}

fn required_env(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .map_err(|_| AwsError::Configuration(format!("missing {name} environment variable")))?;
    if value.trim().is_empty() {
        return Err(AwsError::Configuration(format!("{name} is set but empty")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::Credentials;
    use crate::AwsError;

    #[test]
    fn debug_redacts_secrets() {
        let credentials =
            Credentials::new("AKIDEXAMPLE", "super-secret").with_session_token("token-value");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("token-value"));
    }

    #[test]
    fn blank_keys_are_configuration_errors() {
        assert!(matches!(
            Credentials::new("", "secret").validate(),
            Err(AwsError::Configuration(_))
        ));
        assert!(matches!(
            Credentials::new("AKID", "  ").validate(),
            Err(AwsError::Configuration(_))
        ));
        assert!(matches!(
            Credentials::new("AK/ID", "secret").validate(),
            Err(AwsError::Configuration(_))
        ));
        assert!(Credentials::new("AKID", "secret").validate().is_ok());
    }
}
