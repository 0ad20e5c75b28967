//! Signed HTTP access to AWS service APIs.
//!
//! Every remote collaborator (S3, Comprehend, DynamoDB, the Elasticsearch
//! domain) is reached over plain HTTPS with
//! [AWS Signature Version 4](https://docs.aws.amazon.com/general/latest/gr/sigv4_signing.html)
//! request signing. Signing uses only the pure-Rust `hmac` and `sha2`
//! crates, so no SDK or C library is involved.
//!
//! # Environment Variables
//!
//! Credentials are read from environment variables:
//! - `AWS_ACCESS_KEY_ID` — required
//! - `AWS_SECRET_ACCESS_KEY` — required
//! - `AWS_SESSION_TOKEN` — optional (for temporary credentials / IAM roles)

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Method, Url};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

// ============ AWS Credentials ============

/// AWS credentials used to sign requests.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// Load credentials from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
    /// and optionally `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .context("AWS_ACCESS_KEY_ID environment variable not set")?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self::new(access_key_id, secret_access_key, session_token))
    }
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ============ Signed client ============

/// A reqwest client bound to one region and credential set.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct AwsClient {
    http: reqwest::Client,
    creds: AwsCredentials,
    region: String,
}

/// A request to be signed and sent by [`AwsClient::send`].
pub struct SignedRequest<'a> {
    pub method: Method,
    /// Signing name of the target service (`s3`, `comprehend`, `dynamodb`, `es`).
    pub service: &'a str,
    pub url: Url,
    /// Extra headers to send and sign (e.g. `content-type`, `x-amz-target`).
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl<'a> SignedRequest<'a> {
    pub fn new(method: Method, service: &'a str, url: Url) -> Self {
        Self {
            method,
            service,
            url,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn json_body(mut self, body: &serde_json::Value) -> Result<Self> {
        self.body = serde_json::to_vec(body)?;
        Ok(self)
    }
}

impl AwsClient {
    pub fn new(creds: AwsCredentials, region: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            creds,
            region: region.to_string(),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sign and send `req`, failing on any non-2xx response.
    ///
    /// `operation` only labels errors (e.g. `"DynamoDB PutItem"`).
    pub async fn send(&self, req: SignedRequest<'_>, operation: &str) -> Result<reqwest::Response> {
        let signed = sign_request(
            &self.creds,
            &self.region,
            req.service,
            &req.method,
            &req.url,
            &req.headers,
            &req.body,
            Utc::now(),
        );

        let mut builder = self.http.request(req.method.clone(), req.url.clone());
        for (name, value) in req.headers.iter().chain(signed.iter()) {
            if name == "host" {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !req.body.is_empty() {
            builder = builder.body(req.body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{} request to {} failed: {}", operation, req.url, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "{}: {} failed (HTTP {}): {}",
                req.service,
                operation,
                status,
                body.chars().take(500).collect::<String>()
            );
        }

        Ok(resp)
    }
}

// ============ AWS SigV4 Helpers ============

/// Compute the SigV4 headers for a request.
///
/// Returns `host`, `x-amz-content-sha256`, `x-amz-date`, the optional
/// `x-amz-security-token`, and `authorization`. `extra_headers` (lowercase
/// names) are included in the signature but not returned.
#[allow(clippy::too_many_arguments)]
pub(crate) fn sign_request(
    creds: &AwsCredentials,
    region: &str,
    service: &str,
    method: &Method,
    url: &Url,
    extra_headers: &[(String, String)],
    payload: &[u8],
    now: DateTime<Utc>,
) -> Vec<(String, String)> {
    let date_stamp = now.format("%Y%m%d").to_string();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let payload_hash = hex_sha256(payload);

    let mut generated = vec![
        ("host".to_string(), host_header(url)),
        ("x-amz-content-sha256".to_string(), payload_hash.clone()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if let Some(ref token) = creds.session_token {
        generated.push(("x-amz-security-token".to_string(), token.clone()));
    }

    let mut headers: Vec<(String, String)> = generated
        .iter()
        .cloned()
        .chain(
            extra_headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string())),
        )
        .collect();
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_headers: String = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.as_str(),
        canonical_uri(url),
        canonical_query(url),
        canonical_headers,
        signed_headers,
        payload_hash
    );

    let credential_scope = format!("{}/{}/{}/aws4_request", date_stamp, region, service);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        credential_scope,
        hex_sha256(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(&creds.secret_access_key, &date_stamp, region, service);
    let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

    generated.push((
        "authorization".to_string(),
        format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            creds.access_key_id, credential_scope, signed_headers, signature
        ),
    ));
    generated
}

/// `Host` header value: hostname plus port when it is not the scheme default.
fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// The URL path is already percent-encoded by [`Url`]; an empty path is `/`.
fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// Query parameters, each name and value URI-encoded, sorted by name.
fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Compute the hex-encoded SHA-256 hash of data.
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute HMAC-SHA256 of data with the given key.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Compute hex-encoded HMAC-SHA256.
fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the AWS SigV4 signing key for a given date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986 (used in SigV4 canonical requests).
///
/// Encodes all characters except unreserved characters:
/// `A-Z a-z 0-9 - _ . ~`
pub(crate) fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

/// Resolve a service base URL: the configured override, or the regional
/// AWS endpoint `https://{prefix}.{region}.amazonaws.com/`.
pub(crate) fn service_url(endpoint_url: Option<&str>, prefix: &str, region: &str) -> Result<Url> {
    let raw = match endpoint_url {
        Some(endpoint) => endpoint.trim_end_matches('/').to_string() + "/",
        None => format!("https://{}.{}.amazonaws.com/", prefix, region),
    };
    Url::parse(&raw).with_context(|| format!("Invalid endpoint URL: {}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn signing_key_matches_published_vector() {
        // Example from the AWS SigV4 documentation.
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn empty_payload_hash() {
        assert_eq!(
            hex_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn uri_encode_keeps_unreserved() {
        assert_eq!(uri_encode("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(uri_encode("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn canonical_query_is_sorted_and_encoded() {
        let url = Url::parse("https://host/?prefix=a b&list-type=2").unwrap();
        assert_eq!(canonical_query(&url), "list-type=2&prefix=a%20b");
    }

    #[test]
    fn host_header_includes_non_default_port() {
        let url = Url::parse("http://localhost:4566/").unwrap();
        assert_eq!(host_header(&url), "localhost:4566");
        let url = Url::parse("https://comprehend.us-east-1.amazonaws.com/").unwrap();
        assert_eq!(host_header(&url), "comprehend.us-east-1.amazonaws.com");
    }

    #[test]
    fn signed_headers_cover_extra_headers() {
        let creds = AwsCredentials::new("AKID", "secret", Some("token".into()));
        let url = Url::parse("https://dynamodb.us-east-1.amazonaws.com/").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let headers = sign_request(
            &creds,
            "us-east-1",
            "dynamodb",
            &Method::POST,
            &url,
            &[("X-Amz-Target".into(), "DynamoDB_20120810.GetItem".into())],
            b"{}",
            now,
        );

        let auth = &headers
            .iter()
            .find(|(k, _)| k == "authorization")
            .unwrap()
            .1;
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKID/20240102/us-east-1/dynamodb/aws4_request"
        ));
        assert!(auth.contains(
            "SignedHeaders=host;x-amz-content-sha256;x-amz-date;x-amz-security-token;x-amz-target"
        ));
        assert!(headers
            .iter()
            .any(|(k, v)| k == "x-amz-date" && v == "20240102T030405Z"));
        assert!(!headers.iter().any(|(k, _)| k == "x-amz-target"));
    }

    #[test]
    fn service_url_defaults_to_regional_endpoint() {
        let url = service_url(None, "comprehend", "eu-west-1").unwrap();
        assert_eq!(url.as_str(), "https://comprehend.eu-west-1.amazonaws.com/");
        let url = service_url(Some("http://localhost:4566"), "comprehend", "eu-west-1").unwrap();
        assert_eq!(url.as_str(), "http://localhost:4566/");
    }
}
