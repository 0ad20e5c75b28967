//! # paragraph-qa
//!
//! Paragraph ingestion and question answering on top of managed services.
//!
//! Two stateless handlers share nothing but a record id:
//!
//! ```text
//!  object-created event                     utterance (Lex event)
//!          │                                        │
//!          ▼                                        ▼
//!  ┌───────────────┐   raw record   ┌──────────┐  ┌───────────────┐
//!  │ ingest        │───────────────▶│ DynamoDB │◀─│ query         │
//!  │ S3 → text →   │                └──────────┘  │ key phrases → │
//!  │ paragraphs →  │ annotated rec  ┌──────────┐  │ search → noun │
//!  │ Comprehend    │───────────────▶│  Elastic │◀─│ fallback      │
//!  └───────────────┘                └──────────┘  └───────────────┘
//! ```
//!
//! Handlers receive their collaborators through [`traits::Clients`];
//! AWS-backed implementations sign their own requests ([`aws`]) and the
//! [`memory`] module supplies in-process stand-ins.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Records, annotations, trigger and reply payloads |
//! | [`traits`] | Collaborator traits and the `Clients` bundle |
//! | [`aws`] | SigV4 request signing |
//! | [`connector_s3`] | S3 blob store |
//! | [`comprehend`] | Comprehend NLP client |
//! | [`dynamodb`] | DynamoDB record store |
//! | [`elasticsearch`] | Elasticsearch search index |
//! | [`memory`] | In-memory collaborators |
//! | [`extract`] | Document text extraction |
//! | [`ingest`] | Ingestion handler |
//! | [`query`] | Query handler |
//! | [`server`] | HTTP trigger surface |

pub mod aws;
pub mod comprehend;
pub mod config;
pub mod connector_s3;
pub mod dynamodb;
pub mod elasticsearch;
pub mod extract;
pub mod ingest;
pub mod memory;
pub mod models;
pub mod query;
pub mod server;
pub mod traits;
