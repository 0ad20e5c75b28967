//! Ingestion handler.
//!
//! Triggered by an object-created notification. For every object named in
//! the event: download → extract text → split into paragraphs → annotate
//! each paragraph → write the raw record, then the annotated record.
//!
//! The two writes per paragraph are not transactional. The raw record is
//! always written first, so a failure in between leaves a raw record that
//! no search hit will ever point to; that is accepted.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::extract::{content_type_for_key, extract_text};
use crate::models::{AnnotatedParagraphRecord, RawParagraphRecord, S3Event};
use crate::traits::Clients;

/// Token returned to the trigger after a successful invocation.
pub const SUCCESS_TOKEN: &str = "Execution Successful";

/// Three consecutive newlines separate paragraphs.
pub const PARAGRAPH_DELIMITER: &str = "\n\n\n";

/// Summary of one ingestion invocation.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub objects: usize,
    pub paragraphs: usize,
    /// Whitespace-only paragraphs that were not annotated or stored.
    pub skipped: usize,
    /// Record ids in write order.
    pub ids: Vec<String>,
}

/// Split `text` into paragraphs.
///
/// Scans for [`PARAGRAPH_DELIMITER`] from the cursor; each hit yields the
/// text before it and moves the cursor past it. The segment after the last
/// delimiter is dropped unless `include_trailing` is set and it has
/// non-whitespace content.
pub fn split_paragraphs(text: &str, include_trailing: bool) -> Vec<&str> {
    let mut paragraphs = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find(PARAGRAPH_DELIMITER) {
        let hit = cursor + offset;
        paragraphs.push(&text[cursor..hit]);
        cursor = hit + PARAGRAPH_DELIMITER.len();
    }

    let trailing = &text[cursor..];
    if include_trailing && !trailing.trim().is_empty() {
        paragraphs.push(trailing);
    }

    paragraphs
}

/// Decode an object key from a notification (`+` is a space, then percent-decoding).
pub fn decode_object_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced)
        .with_context(|| format!("Object key is not valid UTF-8 once decoded: {}", raw))?;
    Ok(decoded.into_owned())
}

/// Handle an object-created notification.
///
/// Processes every record in the event in order. Any remote failure aborts
/// the invocation and is returned to the caller.
pub async fn handle_object_created(
    config: &Config,
    clients: &Clients,
    event: &S3Event,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    for record in &event.records {
        let bucket = &record.s3.bucket.name;
        let key = decode_object_key(&record.s3.object.key)?;
        ingest_object(config, clients, bucket, &key, &mut report).await?;
    }

    info!(
        objects = report.objects,
        paragraphs = report.paragraphs,
        skipped = report.skipped,
        "ingestion complete"
    );
    Ok(report)
}

/// Ingest a single object, appending to `report`.
pub async fn ingest_object(
    config: &Config,
    clients: &Clients,
    bucket: &str,
    key: &str,
    report: &mut IngestReport,
) -> Result<()> {
    let bytes = clients.blobs.get_object(bucket, key).await?;
    let text = extract_text(&bytes, content_type_for_key(key))
        .with_context(|| format!("Failed to extract text from s3://{}/{}", bucket, key))?;

    let paragraphs = split_paragraphs(&text, config.ingest.include_trailing);
    info!(bucket, key, paragraphs = paragraphs.len(), "splitting object");

    let language = config.nlp.language_code.as_str();
    for paragraph in paragraphs {
        if paragraph.trim().is_empty() {
            warn!(bucket, key, "skipping whitespace-only paragraph");
            report.skipped += 1;
            continue;
        }

        let entities = clients.nlp.detect_entities(paragraph, language).await?;
        let key_phrases = clients.nlp.detect_key_phrases(paragraph, language).await?;

        let id = Uuid::new_v4().to_string();

        clients
            .records
            .put_record(&RawParagraphRecord {
                id: id.clone(),
                bucket: bucket.to_string(),
                key: key.to_string(),
                paragraph: paragraph.to_string(),
            })
            .await?;

        clients
            .index
            .index_record(&AnnotatedParagraphRecord {
                id: id.clone(),
                bucket: bucket.to_string(),
                key: key.to_string(),
                entities,
                key_phrases,
            })
            .await?;

        debug!(%id, chars = paragraph.len(), "paragraph stored");
        report.paragraphs += 1;
        report.ids.push(id);
    }

    report.objects += 1;
    Ok(())
}
