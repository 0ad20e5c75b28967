//! Amazon Comprehend client.
//!
//! Speaks the AWS JSON 1.1 protocol: every call is a signed `POST /` with an
//! `X-Amz-Target: Comprehend_20171127.<Operation>` header and a JSON body
//! of `{ "Text": ..., "LanguageCode": ... }`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::aws::{service_url, AwsClient, SignedRequest};
use crate::models::{Entity, KeyPhrase, SyntaxToken};
use crate::traits::NlpService;

const TARGET_PREFIX: &str = "Comprehend_20171127";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

pub struct ComprehendClient {
    aws: AwsClient,
    url: Url,
}

#[derive(Deserialize)]
struct DetectEntitiesResponse {
    #[serde(rename = "Entities", default)]
    entities: Vec<Entity>,
}

#[derive(Deserialize)]
struct DetectKeyPhrasesResponse {
    #[serde(rename = "KeyPhrases", default)]
    key_phrases: Vec<KeyPhrase>,
}

#[derive(Deserialize)]
struct DetectSyntaxResponse {
    #[serde(rename = "SyntaxTokens", default)]
    syntax_tokens: Vec<SyntaxToken>,
}

impl ComprehendClient {
    pub fn new(aws: AwsClient, endpoint_url: Option<&str>) -> Result<Self> {
        let url = service_url(endpoint_url, "comprehend", aws.region())?;
        Ok(Self { aws, url })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        text: &str,
        language_code: &str,
    ) -> Result<T> {
        let body = serde_json::json!({
            "Text": text,
            "LanguageCode": language_code,
        });
        let req = SignedRequest::new(Method::POST, "comprehend", self.url.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", format!("{}.{}", TARGET_PREFIX, operation))
            .json_body(&body)?;

        let label = format!("Comprehend {}", operation);
        let resp = self.aws.send(req, &label).await?;
        resp.json::<T>()
            .await
            .with_context(|| format!("Failed to decode {} response", label))
    }
}

#[async_trait]
impl NlpService for ComprehendClient {
    async fn detect_entities(&self, text: &str, language_code: &str) -> Result<Vec<Entity>> {
        let resp: DetectEntitiesResponse =
            self.call("DetectEntities", text, language_code).await?;
        Ok(resp.entities)
    }

    async fn detect_key_phrases(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<Vec<KeyPhrase>> {
        let resp: DetectKeyPhrasesResponse =
            self.call("DetectKeyPhrases", text, language_code).await?;
        Ok(resp.key_phrases)
    }

    async fn detect_syntax(&self, text: &str, language_code: &str) -> Result<Vec<SyntaxToken>> {
        let resp: DetectSyntaxResponse = self.call("DetectSyntax", text, language_code).await?;
        Ok(resp.syntax_tokens)
    }
}
