//! Query handler.
//!
//! Turns a natural-language utterance into a dialog reply:
//!
//! 1. Key phrases of the utterance → primary query.
//! 2. No hits → nouns of the utterance → fallback query.
//! 3. Still no hits → apology. Otherwise the top hit's raw record is
//!    fetched and its paragraph returned in the reply template.
//!
//! An utterance that is blank after trimming gets the apology without any
//! service call. A query string that is blank is never sent to the index
//! and counts as zero hits.

use anyhow::{anyhow, Result};
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{DialogResponse, KeyPhrase, LexEvent, SearchHits, SyntaxToken};
use crate::traits::Clients;

pub const APOLOGY: &str =
    "I'm sorry, I couldn't find something for you. Could you rephrase your question and try again?";

/// Wrap a found paragraph in the reply template.
pub fn found_reply(paragraph: &str) -> String {
    format!("Here is what I have found: \"{}\"", paragraph)
}

/// Join key-phrase texts, each followed by a single space.
pub fn key_phrase_query(phrases: &[KeyPhrase]) -> String {
    phrases.iter().map(|p| format!("{} ", p.text)).collect()
}

/// Join the texts of noun tokens, each followed by a single space.
pub fn noun_query(tokens: &[SyntaxToken]) -> String {
    tokens
        .iter()
        .filter(|t| t.is_noun())
        .map(|t| format!("{} ", t.text))
        .collect()
}

/// Which search produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    KeyPhrases,
    Nouns,
}

/// Outcome of resolving an utterance, before it is rendered as a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Found {
        id: String,
        paragraph: String,
        matched_by: MatchedBy,
    },
    NotFound,
}

impl Answer {
    pub fn reply_text(&self) -> String {
        match self {
            Answer::Found { paragraph, .. } => found_reply(paragraph),
            Answer::NotFound => APOLOGY.to_string(),
        }
    }
}

async fn run_search(clients: &Clients, query: &str, size: usize) -> Result<SearchHits> {
    if query.trim().is_empty() {
        return Ok(SearchHits::default());
    }
    let hits = clients.index.search(query, size).await?;
    debug!(query, total = hits.total, "search");
    Ok(hits)
}

/// Resolve an utterance to the best matching paragraph.
pub async fn answer_question(config: &Config, clients: &Clients, utterance: &str) -> Result<Answer> {
    if utterance.trim().is_empty() {
        return Ok(Answer::NotFound);
    }

    let language = config.nlp.language_code.as_str();
    let size = config.search.size;

    let phrases = clients.nlp.detect_key_phrases(utterance, language).await?;
    let mut hits = run_search(clients, &key_phrase_query(&phrases), size).await?;
    let mut matched_by = MatchedBy::KeyPhrases;

    if hits.is_empty() {
        let tokens = clients.nlp.detect_syntax(utterance, language).await?;
        hits = run_search(clients, &noun_query(&tokens), size).await?;
        matched_by = MatchedBy::Nouns;
    }

    let Some(top) = hits.top() else {
        return Ok(Answer::NotFound);
    };

    let record = clients
        .records
        .get_record(&top.id)
        .await?
        .ok_or_else(|| anyhow!("record {} not found", top.id))?;

    Ok(Answer::Found {
        id: record.id,
        paragraph: record.paragraph,
        matched_by,
    })
}

/// Handle a conversational-agent fulfillment event.
pub async fn handle_utterance(
    config: &Config,
    clients: &Clients,
    event: &LexEvent,
) -> Result<DialogResponse> {
    let answer = answer_question(config, clients, &event.input_transcript).await?;

    match &answer {
        Answer::Found { id, matched_by, .. } => {
            info!(%id, ?matched_by, "answered utterance")
        }
        Answer::NotFound => info!("no paragraph found for utterance"),
    }

    let mut reply = DialogResponse::close(&config.reply.content_type, answer.reply_text());
    reply.session_attributes = event.session_attributes.clone();
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartOfSpeech;

    fn phrase(text: &str) -> KeyPhrase {
        KeyPhrase {
            score: 0.9,
            text: text.into(),
            begin_offset: 0,
            end_offset: 0,
        }
    }

    fn token(text: &str, tag: &str) -> SyntaxToken {
        SyntaxToken {
            token_id: 0,
            text: text.into(),
            begin_offset: 0,
            end_offset: 0,
            part_of_speech: PartOfSpeech {
                tag: tag.into(),
                score: 0.9,
            },
        }
    }

    #[test]
    fn key_phrases_are_space_terminated() {
        let q = key_phrase_query(&[phrase("the wall"), phrase("Mexico")]);
        assert_eq!(q, "the wall Mexico ");
        assert_eq!(key_phrase_query(&[]), "");
    }

    #[test]
    fn noun_query_keeps_only_nouns() {
        let q = noun_query(&[
            token("What", "PRON"),
            token("about", "ADP"),
            token("jobs", "NOUN"),
            token("Ohio", "PROPN"),
            token("trade", "NOUN"),
        ]);
        assert_eq!(q, "jobs trade ");
    }

    #[test]
    fn reply_texts() {
        assert_eq!(
            found_reply("We will win."),
            "Here is what I have found: \"We will win.\""
        );
        assert_eq!(Answer::NotFound.reply_text(), APOLOGY);
    }
}
