//! Core data models used throughout paragraph-qa.
//!
//! These types cover the records written during ingestion, the NLP
//! annotations attached to them, and the trigger/response payloads of the
//! two handlers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unannotated paragraph text plus provenance, stored in the key-value table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawParagraphRecord {
    pub id: String,
    pub bucket: String,
    pub key: String,
    pub paragraph: String,
}

/// NLP annotations of one paragraph, written to the search index.
///
/// Shares its `id` with the [`RawParagraphRecord`] of the same paragraph.
/// Annotation fields keep the NLP service's own names so the indexed
/// document looks exactly like the merged service responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedParagraphRecord {
    pub id: String,
    pub bucket: String,
    pub key: String,
    #[serde(rename = "Entities", default)]
    pub entities: Vec<Entity>,
    #[serde(rename = "KeyPhrases", default)]
    pub key_phrases: Vec<KeyPhrase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entity {
    #[serde(default)]
    pub score: f64,
    #[serde(rename = "Type")]
    pub entity_type: String,
    pub text: String,
    #[serde(default)]
    pub begin_offset: i64,
    #[serde(default)]
    pub end_offset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyPhrase {
    #[serde(default)]
    pub score: f64,
    pub text: String,
    #[serde(default)]
    pub begin_offset: i64,
    #[serde(default)]
    pub end_offset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyntaxToken {
    #[serde(default)]
    pub token_id: i64,
    pub text: String,
    #[serde(default)]
    pub begin_offset: i64,
    #[serde(default)]
    pub end_offset: i64,
    pub part_of_speech: PartOfSpeech,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PartOfSpeech {
    pub tag: String,
    #[serde(default)]
    pub score: f64,
}

/// Part-of-speech tag the fallback query keeps.
pub const NOUN_TAG: &str = "NOUN";

impl SyntaxToken {
    pub fn is_noun(&self) -> bool {
        self.part_of_speech.tag == NOUN_TAG
    }
}

// ============ Search results ============

/// Ranked hits returned by a [`SearchIndex`](crate::traits::SearchIndex).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    /// Total number of matching documents reported by the index.
    pub total: u64,
    /// Hits in rank order (at most the requested size).
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Shared record identifier taken from the hit's source document.
    pub id: String,
    pub score: Option<f64>,
}

impl SearchHits {
    pub fn is_empty(&self) -> bool {
        self.total == 0 || self.hits.is_empty()
    }

    pub fn top(&self) -> Option<&SearchHit> {
        if self.total == 0 {
            return None;
        }
        self.hits.first()
    }
}

// ============ Ingestion trigger ============

/// Object-created notification, as delivered by S3.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3ObjectRef {
    /// URL-encoded object key (`+` for spaces).
    pub key: String,
}

impl S3Event {
    /// Build a single-record notification, encoding `key` the way S3 does
    /// (`+` for spaces, `/` left as is).
    pub fn single(bucket: &str, key: &str) -> Self {
        let encoded = key
            .split(' ')
            .map(|part| urlencoding::encode(part).replace("%2F", "/"))
            .collect::<Vec<_>>()
            .join("+");
        Self {
            records: vec![S3EventRecord {
                s3: S3Entity {
                    bucket: S3Bucket {
                        name: bucket.to_string(),
                    },
                    object: S3ObjectRef { key: encoded },
                },
            }],
        }
    }
}

// ============ Query trigger and reply ============

/// Conversational-agent fulfillment event (Lex V1 shape).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LexEvent {
    pub input_transcript: String,
    #[serde(default)]
    pub session_attributes: Option<HashMap<String, String>>,
}

impl LexEvent {
    pub fn from_utterance(utterance: &str) -> Self {
        Self {
            input_transcript: utterance.to_string(),
            session_attributes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_attributes: Option<HashMap<String, String>>,
    pub dialog_action: DialogAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub fulfillment_state: String,
    pub message: DialogMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogMessage {
    pub content_type: String,
    pub content: String,
}

impl DialogResponse {
    /// A fulfilled `Close` action carrying `content`.
    pub fn close(content_type: &str, content: String) -> Self {
        Self {
            session_attributes: None,
            dialog_action: DialogAction {
                action_type: "Close".to_string(),
                fulfillment_state: "Fulfilled".to_string(),
                message: DialogMessage {
                    content_type: content_type.to_string(),
                    content,
                },
            },
        }
    }

    pub fn content(&self) -> &str {
        &self.dialog_action.message.content
    }
}
