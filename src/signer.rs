//! AWS Signature Version 4 request signing.
//!
//! [`Signer::sign`] turns an [`AwsRequest`] into a [`SignedRequest`]:
//!
//! 1. Add `host`, `x-amz-date` and, for temporary credentials,
//!    `x-amz-security-token`.
//! 2. Build the canonical request over every header on the request.
//! 3. Build the string to sign from the timestamp, credential scope and
//!    canonical request hash.
//! 4. Derive the signing key with the HMAC-SHA256 chain and sign.
//! 5. Add the `authorization` header.
//!
//! Signing happens once per call. The dispatcher resends the resulting
//! request unchanged on every retry.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, HOST};
use reqwest::Url;
use sha2::Sha256;

use crate::canonical::{push_header, CanonicalHeaders, CanonicalRequest};
use crate::{AwsError, AwsRequest, Credentials, Result, SignedRequest};

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const DATE_HEADER: &str = "x-amz-date";
const SECURITY_TOKEN_HEADER: &str = "x-amz-security-token";

type HmacSha256 = Hmac<Sha256>;

/// Signs requests with one credential set and a default region.
#[derive(Clone, Debug)]
pub struct Signer {
    credentials: Option<Credentials>,
    region: String,
}

/// Region and service a signature is scoped to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    pub region: String,
    pub service: String,
}

impl Signer {
    pub fn new(credentials: Option<Credentials>, region: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn sign(&self, request: AwsRequest) -> Result<SignedRequest> {
        self.sign_at(request, Utc::now())
    }

    /// Signs as if the current time were `now`.
    pub fn sign_at(&self, request: AwsRequest, now: DateTime<Utc>) -> Result<SignedRequest> {
        if let Some(reason) = request.invalid {
            return Err(AwsError::Configuration(reason));
        }
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            AwsError::Configuration("no signing credentials configured".to_owned())
        })?;
        credentials.validate()?;

        let url = Url::parse(&request.url).map_err(|err| {
            AwsError::Configuration(format!("invalid url '{}': {err}", request.url))
        })?;
        let host = host_header_value(&url)?;
        let scope = self.resolve_scope(&url, request.service.as_deref())?;

        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let mut headers = request.headers;
        headers.remove(AUTHORIZATION);
        headers.insert(HOST, header_value(&host)?);
        headers.insert(HeaderName::from_static(DATE_HEADER), header_value(&timestamp)?);
        if let Some(token) = credentials.session_token() {
            headers.insert(
                HeaderName::from_static(SECURITY_TOKEN_HEADER),
                header_value(token)?,
            );
        }

        let mut canonical_headers = CanonicalHeaders::new();
        for (name, value) in &headers {
            let value = value.to_str().map_err(|_| {
                AwsError::Configuration(format!("header '{name}' is not visible ASCII"))
            })?;
            push_header(&mut canonical_headers, name.as_str(), value);
        }

        let canonical = CanonicalRequest::new(
            request.method.as_str(),
            url.path(),
            url.query().unwrap_or(""),
            &canonical_headers,
            &request.body,
        );

        let credential_scope = format!("{date}/{}/{}/aws4_request", scope.region, scope.service);
        let string_to_sign = build_string_to_sign(&timestamp, &credential_scope, &canonical.hash());
        let signing_key = derive_signing_key(
            credentials.secret_access_key(),
            &date,
            &scope.region,
            &scope.service,
        );
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let authorization = format!(
            "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={}, Signature={signature}",
            credentials.access_key_id(),
            canonical.signed_headers,
        );
        headers.insert(AUTHORIZATION, header_value(&authorization)?);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %request.method,
            url = %url,
            region = %scope.region,
            service = %scope.service,
            signed_headers = %canonical.signed_headers,
            "signed request"
        );

        Ok(SignedRequest {
            method: request.method,
            url,
            headers,
            body: request.body,
        })
    }

    /// Service comes from the request or the host; region from the host or the signer.
    fn resolve_scope(&self, url: &Url, service: Option<&str>) -> Result<Scope> {
        let (host_service, host_region) = url
            .host_str()
            .map(infer_scope_from_host)
            .unwrap_or((None, None));

        let service = service
            .map(ToOwned::to_owned)
            .or(host_service)
            .ok_or_else(|| {
                AwsError::Configuration(format!("cannot determine signing service for '{url}'"))
            })?;
        let region = host_region.unwrap_or_else(|| self.region.clone());
        if region.trim().is_empty() {
            return Err(AwsError::Configuration("signing region is empty".to_owned()));
        }

        Ok(Scope { region, service })
    }
}

/// Splits `service.region.amazonaws.com` into its parts.
///
/// Global endpoints such as `iam.amazonaws.com` yield only a service.
pub fn infer_scope_from_host(host: &str) -> (Option<String>, Option<String>) {
    let Some(prefix) = host
        .strip_suffix(".amazonaws.com")
        .or_else(|| host.strip_suffix(".amazonaws.com.cn"))
    else {
        return (None, None);
    };

    let mut labels = prefix.split('.');
    let service = labels.next().filter(|s| !s.is_empty()).map(ToOwned::to_owned);
    let region = labels.next().filter(|s| !s.is_empty()).map(ToOwned::to_owned);
    (service, region)
}

/// `StringToSign = Algorithm \n Timestamp \n Scope \n Hex(SHA256(CanonicalRequest))`
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_hash}")
}

/// ```text
/// kDate    = HMAC("AWS4" + secret, date)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
pub fn derive_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let region_key = hmac_sha256(&date_key, region.as_bytes());
    let service_key = hmac_sha256(&region_key, service.as_bytes());
    hmac_sha256(&service_key, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn host_header_value(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| AwsError::Configuration(format!("url '{url}' has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| AwsError::Configuration(format!("invalid header value '{value}'")))
}
