//! Shared fixtures: a scripted NLP stub, in-memory clients, and DOCX builders.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use paragraph_qa::config::Config;
use paragraph_qa::memory::{InMemoryBlobStore, InMemoryRecordStore, InMemorySearchIndex};
use paragraph_qa::models::{Entity, KeyPhrase, PartOfSpeech, SyntaxToken};
use paragraph_qa::traits::{Clients, NlpService};

pub const BUCKET: &str = "speeches";

/// Deterministic stand-in for the NLP service.
///
/// - Key phrases: scripted per exact text, otherwise every word of 4+ chars.
/// - Entities: capitalized words, typed `OTHER`.
/// - Syntax: every word; tagged `NOUN` when listed in `nouns`, else `VERB`.
#[derive(Default)]
pub struct ScriptedNlp {
    key_phrases: HashMap<String, Vec<String>>,
    nouns: HashSet<String>,
    calls: AtomicUsize,
}

impl ScriptedNlp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_phrases(mut self, text: &str, phrases: &[&str]) -> Self {
        self.key_phrases.insert(
            text.to_string(),
            phrases.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn with_nouns(mut self, nouns: &[&str]) -> Self {
        self.nouns.extend(nouns.iter().map(|n| n.to_lowercase()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

#[async_trait]
impl NlpService for ScriptedNlp {
    async fn detect_entities(&self, text: &str, _language_code: &str) -> Result<Vec<Entity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(words(text)
            .into_iter()
            .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
            .map(|w| Entity {
                score: 0.9,
                entity_type: "OTHER".to_string(),
                text: w.to_string(),
                begin_offset: 0,
                end_offset: w.len() as i64,
            })
            .collect())
    }

    async fn detect_key_phrases(
        &self,
        text: &str,
        _language_code: &str,
    ) -> Result<Vec<KeyPhrase>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let phrases: Vec<String> = match self.key_phrases.get(text) {
            Some(scripted) => scripted.clone(),
            None => words(text)
                .into_iter()
                .filter(|w| w.len() >= 4)
                .map(str::to_string)
                .collect(),
        };
        Ok(phrases
            .into_iter()
            .map(|p| KeyPhrase {
                score: 0.9,
                end_offset: p.len() as i64,
                text: p,
                begin_offset: 0,
            })
            .collect())
    }

    async fn detect_syntax(&self, text: &str, _language_code: &str) -> Result<Vec<SyntaxToken>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(words(text)
            .into_iter()
            .enumerate()
            .map(|(i, w)| SyntaxToken {
                token_id: i as i64 + 1,
                text: w.to_string(),
                begin_offset: 0,
                end_offset: w.len() as i64,
                part_of_speech: PartOfSpeech {
                    tag: if self.nouns.contains(&w.to_lowercase()) {
                        "NOUN".to_string()
                    } else {
                        "VERB".to_string()
                    },
                    score: 0.9,
                },
            })
            .collect())
    }
}

/// In-memory backends plus the `Clients` bundle wrapping them.
pub struct Harness {
    pub blobs: Arc<InMemoryBlobStore>,
    pub nlp: Arc<ScriptedNlp>,
    pub records: Arc<InMemoryRecordStore>,
    pub index: Arc<InMemorySearchIndex>,
    pub clients: Clients,
}

impl Harness {
    pub fn new(nlp: ScriptedNlp) -> Self {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let nlp = Arc::new(nlp);
        let records = Arc::new(InMemoryRecordStore::new());
        let index = Arc::new(InMemorySearchIndex::new());
        let clients = Clients::new(blobs.clone(), nlp.clone(), records.clone(), index.clone());
        Self {
            blobs,
            nlp,
            records,
            index,
            clients,
        }
    }
}

pub fn test_config(include_trailing: bool) -> Config {
    toml::from_str(&format!(
        r#"[search]
endpoint = "http://localhost:9200"

[ingest]
include_trailing = {}
"#,
        include_trailing
    ))
    .unwrap()
}

/// Minimal docx whose body holds one `w:p` per entry; `""` is an empty paragraph.
pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| {
            if p.is_empty() {
                "<w:p/>".to_string()
            } else {
                format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p)
            }
        })
        .collect();

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

/// Three speech paragraphs separated by empty Word paragraphs.
pub fn speech_docx() -> Vec<u8> {
    docx_with_paragraphs(&[
        "Jobs are coming back to Michigan",
        "",
        "The border wall will be built",
        "",
        "Closing remarks about healthcare",
    ])
}
