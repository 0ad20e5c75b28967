//! In-memory collaborators for testing and local runs.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! The search index tokenizes the entity and key-phrase texts of each
//! annotated record into lowercase words and requires every query term to
//! be present (AND), scoring by the number of matching word occurrences.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{AnnotatedParagraphRecord, RawParagraphRecord, SearchHit, SearchHits};
use crate::traits::{BlobStore, RecordStore, SearchIndex};

/// Lowercase alphanumeric words of `text`.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

// ============ Blob store ============

#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_object(&self, bucket: &str, key: &str, bytes: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), bytes.into());
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("object not found: s3://{}/{}", bucket, key))
    }
}

// ============ Record store ============

#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, RawParagraphRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn put_record(&self, record: &RawParagraphRecord) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<Option<RawParagraphRecord>> {
        Ok(self.records.read().unwrap().get(id).cloned())
    }
}

// ============ Search index ============

struct IndexedRecord {
    record: AnnotatedParagraphRecord,
    words: Vec<String>,
}

#[derive(Default)]
pub struct InMemorySearchIndex {
    docs: RwLock<Vec<IndexedRecord>>,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// All indexed records, in insertion order.
    pub fn records(&self) -> Vec<AnnotatedParagraphRecord> {
        self.docs
            .read()
            .unwrap()
            .iter()
            .map(|d| d.record.clone())
            .collect()
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn index_record(&self, record: &AnnotatedParagraphRecord) -> Result<()> {
        let text = record
            .entities
            .iter()
            .map(|e| e.text.as_str())
            .chain(record.key_phrases.iter().map(|k| k.text.as_str()))
            .collect::<Vec<_>>()
            .join(" ");
        self.docs.write().unwrap().push(IndexedRecord {
            record: record.clone(),
            words: words(&text),
        });
        Ok(())
    }

    async fn search(&self, query: &str, size: usize) -> Result<SearchHits> {
        let terms = words(query);
        if terms.is_empty() {
            return Ok(SearchHits::default());
        }

        let docs = self.docs.read().unwrap();
        let mut scored: Vec<(usize, &AnnotatedParagraphRecord)> = docs
            .iter()
            .filter(|d| terms.iter().all(|t| d.words.contains(t)))
            .map(|d| {
                let score = d.words.iter().filter(|w| terms.contains(w)).count();
                (score, &d.record)
            })
            .collect();
        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(SearchHits {
            total: scored.len() as u64,
            hits: scored
                .into_iter()
                .take(size)
                .map(|(score, record)| SearchHit {
                    id: record.id.clone(),
                    score: Some(score as f64),
                })
                .collect(),
        })
    }
}
