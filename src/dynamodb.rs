//! Amazon DynamoDB record store.
//!
//! Raw paragraph records live in a single table keyed by the string
//! attribute `id`. Calls use the AWS JSON 1.0 protocol
//! (`X-Amz-Target: DynamoDB_20120810.PutItem` / `GetItem`) with DynamoDB's
//! typed attribute-value encoding:
//!
//! ```json
//! { "id": { "S": "…" }, "bucket": { "S": "…" }, "key": { "S": "…" }, "paragraph": { "S": "…" } }
//! ```

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::aws::{service_url, AwsClient, SignedRequest};
use crate::models::RawParagraphRecord;
use crate::traits::RecordStore;

const TARGET_PREFIX: &str = "DynamoDB_20120810";
const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

pub struct DynamoDbRecordStore {
    aws: AwsClient,
    url: Url,
    table: String,
}

/// A string-typed DynamoDB attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StringAttr {
    #[serde(rename = "S")]
    s: String,
}

type Item = HashMap<String, StringAttr>;

#[derive(Deserialize)]
struct GetItemResponse {
    #[serde(rename = "Item")]
    item: Option<HashMap<String, serde_json::Value>>,
}

fn encode_item(record: &RawParagraphRecord) -> Item {
    [
        ("id", &record.id),
        ("bucket", &record.bucket),
        ("key", &record.key),
        ("paragraph", &record.paragraph),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), StringAttr { s: value.clone() }))
    .collect()
}

/// Decode a raw record, ignoring attributes that are not strings.
fn decode_item(item: &HashMap<String, serde_json::Value>) -> Result<RawParagraphRecord> {
    let field = |name: &str| -> Result<String> {
        item.get(name)
            .and_then(|attr| attr.get("S"))
            .and_then(|s| s.as_str())
            .map(str::to_string)
            .with_context(|| format!("record is missing string attribute '{}'", name))
    };
    Ok(RawParagraphRecord {
        id: field("id")?,
        bucket: field("bucket")?,
        key: field("key")?,
        paragraph: field("paragraph")?,
    })
}

impl DynamoDbRecordStore {
    pub fn new(aws: AwsClient, table: &str, endpoint_url: Option<&str>) -> Result<Self> {
        let url = service_url(endpoint_url, "dynamodb", aws.region())?;
        Ok(Self {
            aws,
            url,
            table: table.to_string(),
        })
    }

    fn request(&self, operation: &str, body: &serde_json::Value) -> Result<SignedRequest<'static>> {
        SignedRequest::new(Method::POST, "dynamodb", self.url.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", format!("{}.{}", TARGET_PREFIX, operation))
            .json_body(body)
    }
}

#[async_trait]
impl RecordStore for DynamoDbRecordStore {
    async fn put_record(&self, record: &RawParagraphRecord) -> Result<()> {
        let body = json!({
            "TableName": self.table,
            "Item": encode_item(record),
        });
        self.aws
            .send(
                self.request("PutItem", &body)?,
                &format!("DynamoDB PutItem {}", self.table),
            )
            .await?;
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<Option<RawParagraphRecord>> {
        let body = json!({
            "TableName": self.table,
            "Key": { "id": { "S": id } },
        });
        let resp = self
            .aws
            .send(
                self.request("GetItem", &body)?,
                &format!("DynamoDB GetItem {}", self.table),
            )
            .await?;

        let parsed: GetItemResponse = resp
            .json()
            .await
            .context("Failed to decode DynamoDB GetItem response")?;

        parsed.item.as_ref().map(decode_item).transpose()
    }
}
