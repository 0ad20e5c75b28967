//! Elasticsearch / OpenSearch search index.
//!
//! Annotated records are indexed with `POST {endpoint}/{index}/{doc_type}`
//! (the index assigns the document `_id`; the shared record id travels in
//! the document body). Queries use `simple_query_string` with
//! `default_operator: and`:
//!
//! ```json
//! { "size": 50, "query": { "simple_query_string": { "query": "…", "default_operator": "and" } } }
//! ```
//!
//! Requests are SigV4-signed for the `es` service, as required by managed
//! AWS domains with IAM access policies.
//!
//! # Hit counts
//!
//! `hits.total` is a plain integer on Elasticsearch 6 and earlier and an
//! object `{ "value": n, "relation": "eq" }` from 7 on. Both shapes are
//! accepted; when it is absent the number of returned hits is used.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::aws::{AwsClient, SignedRequest};
use crate::config::SearchConfig;
use crate::models::{AnnotatedParagraphRecord, SearchHit, SearchHits};
use crate::traits::SearchIndex;

pub struct ElasticsearchIndex {
    aws: AwsClient,
    endpoint: String,
    index: String,
    doc_type: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

impl TotalHits {
    fn value(&self) -> u64 {
        match self {
            TotalHits::Count(n) => *n,
            TotalHits::Object { value } => *value,
        }
    }
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: serde_json::Value,
}

/// Convert a `_search` response body into [`SearchHits`].
pub fn parse_search_response(body: &str) -> Result<SearchHits> {
    let resp: SearchResponse =
        serde_json::from_str(body).context("Failed to decode search response")?;

    let hits: Vec<SearchHit> = resp
        .hits
        .hits
        .into_iter()
        .filter_map(|hit| match hit.source.get("id").and_then(|v| v.as_str()) {
            Some(id) => Some(SearchHit {
                id: id.to_string(),
                score: hit.score,
            }),
            None => {
                warn!("search hit without an id in _source; skipping");
                None
            }
        })
        .collect();

    let total = resp
        .hits
        .total
        .map(|t| t.value())
        .unwrap_or(hits.len() as u64);

    Ok(SearchHits { total, hits })
}

/// Body of a `simple_query_string` AND search.
fn search_body(query: &str, size: usize) -> serde_json::Value {
    json!({
        "size": size,
        "query": {
            "simple_query_string": {
                "query": query,
                "default_operator": "and"
            }
        }
    })
}

impl ElasticsearchIndex {
    pub fn new(aws: AwsClient, config: &SearchConfig) -> Result<Self> {
        Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid search endpoint: {}", config.endpoint))?;
        Ok(Self {
            aws,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            doc_type: config.doc_type.clone(),
        })
    }

    fn url(&self, suffix: &str) -> Result<Url> {
        let raw = format!("{}/{}/{}", self.endpoint, self.index, suffix);
        Url::parse(&raw).with_context(|| format!("Invalid search URL: {}", raw))
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn index_record(&self, record: &AnnotatedParagraphRecord) -> Result<()> {
        let req = SignedRequest::new(Method::POST, "es", self.url(&self.doc_type)?)
            .header("content-type", "application/json")
            .json_body(&serde_json::to_value(record)?)?;
        self.aws
            .send(req, &format!("Index document into {}", self.index))
            .await?;
        Ok(())
    }

    async fn search(&self, query: &str, size: usize) -> Result<SearchHits> {
        let req = SignedRequest::new(Method::POST, "es", self.url("_search")?)
            .header("content-type", "application/json")
            .json_body(&search_body(query, size))?;
        let resp = self
            .aws
            .send(req, &format!("Search {}", self.index))
            .await?;
        let body = resp.text().await?;
        parse_search_response(&body)
    }
}
