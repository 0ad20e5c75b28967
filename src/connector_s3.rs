//! Amazon S3 blob store.
//!
//! Downloads uploaded documents with signed `GetObject` requests against the
//! S3 REST API. Supports custom endpoints for S3-compatible services
//! (MinIO, LocalStack).
//!
//! # Configuration
//!
//! ```toml
//! [blob]
//! # endpoint_url = "http://localhost:9000"   # MinIO
//! ```
//!
//! # Addressing
//!
//! | Endpoint | URL |
//! |----------|-----|
//! | AWS (default) | `https://<bucket>.s3.<region>.amazonaws.com/<key>` |
//! | Custom | `<endpoint_url>/<bucket>/<key>` (path style) |

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, Url};
use tracing::debug;

use crate::aws::{uri_encode, AwsClient, SignedRequest};
use crate::traits::BlobStore;

/// S3-backed [`BlobStore`].
pub struct S3BlobStore {
    aws: AwsClient,
    endpoint_url: Option<String>,
}

impl S3BlobStore {
    pub fn new(aws: AwsClient, endpoint_url: Option<String>) -> Self {
        Self { aws, endpoint_url }
    }

    /// Compute the object URL for `bucket/key`.
    ///
    /// Each key segment is URI-encoded and `/` separators are kept. A key
    /// with a `.` or `..` segment is sent as one segment with `/` encoded,
    /// since URL parsing would otherwise resolve those segments away.
    fn object_url(&self, bucket: &str, key: &str) -> Result<Url> {
        let encoded_key = encode_key(key)?;
        let raw = match self.endpoint_url {
            Some(ref endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                bucket,
                encoded_key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                bucket,
                self.aws.region(),
                encoded_key
            ),
        };
        Url::parse(&raw).with_context(|| format!("Invalid S3 object URL: {}", raw))
    }
}

fn is_dot_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}

fn encode_key(key: &str) -> Result<String> {
    if is_dot_segment(key) {
        anyhow::bail!("Object key {:?} cannot be addressed in a URL path", key);
    }
    if key.split('/').any(is_dot_segment) {
        return Ok(uri_encode(key));
    }
    Ok(key.split('/').map(uri_encode).collect::<Vec<_>>().join("/"))
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let url = self.object_url(bucket, key)?;
        debug!(bucket, key, "downloading object");

        let resp = self
            .aws
            .send(
                SignedRequest::new(Method::GET, "s3", url),
                &format!("S3 GetObject s3://{}/{}", bucket, key),
            )
            .await?;

        let bytes = resp
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of s3://{}/{}", bucket, key))?;
        Ok(bytes.to_vec())
    }
}
