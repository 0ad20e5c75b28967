//! Collaborator traits and the client bundle handed to each handler.
//!
//! Both handlers only orchestrate; the real work happens in four external
//! services. Each one sits behind a trait so that handlers receive their
//! client handles explicitly instead of reaching for process-wide globals:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      Clients                         │
//! │  ┌──────────┐ ┌────────────┐ ┌──────────┐ ┌────────┐ │
//! │  │BlobStore │ │ NlpService │ │ Record   │ │ Search │ │
//! │  │  (S3)    │ │(Comprehend)│ │ Store    │ │ Index  │ │
//! │  │          │ │            │ │(DynamoDB)│ │  (ES)  │ │
//! │  └──────────┘ └────────────┘ └──────────┘ └────────┘ │
//! └──────────────┬────────────────────────┬──────────────┘
//!                ▼                        ▼
//!     handle_object_created()     handle_utterance()
//! ```
//!
//! The [`memory`](crate::memory) module provides in-process
//! implementations of the storage traits for tests and local runs.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::aws::{AwsClient, AwsCredentials};
use crate::comprehend::ComprehendClient;
use crate::config::Config;
use crate::connector_s3::S3BlobStore;
use crate::dynamodb::DynamoDbRecordStore;
use crate::elasticsearch::ElasticsearchIndex;
use crate::models::{
    AnnotatedParagraphRecord, Entity, KeyPhrase, RawParagraphRecord, SearchHits, SyntaxToken,
};

/// Source of uploaded documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the full content of `bucket/key`.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

/// Managed NLP service: entities, key phrases, and part-of-speech tagging.
#[async_trait]
pub trait NlpService: Send + Sync {
    async fn detect_entities(&self, text: &str, language_code: &str) -> Result<Vec<Entity>>;

    async fn detect_key_phrases(&self, text: &str, language_code: &str)
        -> Result<Vec<KeyPhrase>>;

    async fn detect_syntax(&self, text: &str, language_code: &str) -> Result<Vec<SyntaxToken>>;
}

/// Key-value table holding raw paragraph records, keyed by `id`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put_record(&self, record: &RawParagraphRecord) -> Result<()>;

    /// Returns `None` when no record exists for `id`.
    async fn get_record(&self, id: &str) -> Result<Option<RawParagraphRecord>>;
}

/// Full-text index over annotated paragraph records.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn index_record(&self, record: &AnnotatedParagraphRecord) -> Result<()>;

    /// Multi-term query where every term must match (AND), returning at
    /// most `size` hits in rank order.
    async fn search(&self, query: &str, size: usize) -> Result<SearchHits>;
}

/// Client handles passed into every handler invocation.
#[derive(Clone)]
pub struct Clients {
    pub blobs: Arc<dyn BlobStore>,
    pub nlp: Arc<dyn NlpService>,
    pub records: Arc<dyn RecordStore>,
    pub index: Arc<dyn SearchIndex>,
}

impl Clients {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        nlp: Arc<dyn NlpService>,
        records: Arc<dyn RecordStore>,
        index: Arc<dyn SearchIndex>,
    ) -> Self {
        Self {
            blobs,
            nlp,
            records,
            index,
        }
    }

    /// Build AWS-backed clients from configuration and environment credentials.
    pub fn from_config(config: &Config) -> Result<Self> {
        let creds = AwsCredentials::from_env()?;
        let aws = AwsClient::new(creds, &config.aws.region, config.aws.timeout_secs)?;

        Ok(Self::new(
            Arc::new(S3BlobStore::new(
                aws.clone(),
                config.blob.endpoint_url.clone(),
            )),
            Arc::new(ComprehendClient::new(
                aws.clone(),
                config.nlp.endpoint_url.as_deref(),
            )?),
            Arc::new(DynamoDbRecordStore::new(
                aws.clone(),
                &config.records.table,
                config.records.endpoint_url.as_deref(),
            )?),
            Arc::new(ElasticsearchIndex::new(aws, &config.search)?),
        ))
    }
}
