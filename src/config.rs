use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable that overrides `[search].endpoint`.
pub const SEARCH_ENDPOINT_ENV: &str = "ES_ENDPOINT";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub blob: EndpointConfig,
    #[serde(default)]
    pub nlp: NlpConfig,
    #[serde(default)]
    pub records: RecordsConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub reply: ReplyConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AwsConfig {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

/// Optional endpoint override for S3-compatible services (MinIO, LocalStack).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EndpointConfig {
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NlpConfig {
    #[serde(default = "default_language_code")]
    pub language_code: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            language_code: default_language_code(),
            endpoint_url: None,
        }
    }
}

fn default_language_code() -> String {
    "en".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecordsConfig {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            endpoint_url: None,
        }
    }
}

fn default_table() -> String {
    "speech-table".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Domain endpoint. May be left empty when `ES_ENDPOINT` is set.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_doc_type")]
    pub doc_type: String,
    #[serde(default = "default_size")]
    pub size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            index: default_index(),
            doc_type: default_doc_type(),
            size: default_size(),
        }
    }
}

fn default_index() -> String {
    "speech-v1".to_string()
}
fn default_doc_type() -> String {
    "_doc".to_string()
}
fn default_size() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IngestConfig {
    /// Also process the segment after the last paragraph delimiter.
    #[serde(default)]
    pub include_trailing: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplyConfig {
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            content_type: default_content_type(),
        }
    }
}

fn default_content_type() -> String {
    "SSML".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

impl Config {
    /// Replace the search endpoint with `endpoint` when one is given,
    /// prefixing `https://` if no scheme is present.
    pub fn apply_endpoint_override(&mut self, endpoint: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.search.endpoint = endpoint.trim().to_string();
        }
        let endpoint = self.search.endpoint.trim_end_matches('/');
        self.search.endpoint = if endpoint.is_empty()
            || endpoint.starts_with("https://")
            || endpoint.starts_with("http://")
        {
            endpoint.to_string()
        } else {
            format!("https://{}", endpoint)
        };
    }

    pub fn validate(&self) -> Result<()> {
        if self.aws.region.trim().is_empty() {
            anyhow::bail!("aws.region must not be empty");
        }
        if self.nlp.language_code.trim().is_empty() {
            anyhow::bail!("nlp.language_code must not be empty");
        }
        if self.records.table.trim().is_empty() {
            anyhow::bail!("records.table must not be empty");
        }
        if self.search.endpoint.is_empty() {
            anyhow::bail!(
                "search.endpoint must be set (or provide the {} environment variable)",
                SEARCH_ENDPOINT_ENV
            );
        }
        if self.search.index.trim().is_empty() {
            anyhow::bail!("search.index must not be empty");
        }
        if self.search.size == 0 {
            anyhow::bail!("search.size must be >= 1");
        }

        match self.reply.content_type.as_str() {
            "PlainText" | "SSML" | "CustomPayload" => {}
            other => anyhow::bail!(
                "Unknown reply.content_type: '{}'. Must be PlainText, SSML, or CustomPayload.",
                other
            ),
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config.apply_endpoint_override(std::env::var(SEARCH_ENDPOINT_ENV).ok());
    config.validate()?;

    Ok(config)
}
