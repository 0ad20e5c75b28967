//! HTTP trigger surface, exercised over a real socket.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};

use common::{speech_docx, test_config, Harness, ScriptedNlp, BUCKET};
use paragraph_qa::query::APOLOGY;
use paragraph_qa::server::router;

async fn start_server(h: &Harness) -> SocketAddr {
    let app = router(Arc::new(test_config(false)), h.clients.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn s3_event(key: &str) -> Value {
    json!({
        "Records": [{
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": { "name": BUCKET },
                "object": { "key": key }
            }
        }]
    })
}

#[tokio::test]
async fn health_reports_version() {
    let h = Harness::new(ScriptedNlp::new());
    let addr = start_server(&h).await;

    let body: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn ingest_then_query_over_http() {
    let utterance = "Where are jobs coming back";
    let h = Harness::new(ScriptedNlp::new().with_key_phrases(utterance, &["jobs"]));
    h.blobs.put_object(BUCKET, "rally.docx", speech_docx());
    let addr = start_server(&h).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{}/ingest", addr))
        .json(&s3_event("rally.docx"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let token: Value = resp.json().await.unwrap();
    assert_eq!(token, "Execution Successful");
    assert_eq!(h.records.len(), 2);

    let resp = client
        .post(format!("http://{}/query", addr))
        .json(&json!({ "inputTranscript": utterance, "sessionAttributes": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let reply: Value = resp.json().await.unwrap();
    assert_eq!(reply["dialogAction"]["type"], "Close");
    assert_eq!(reply["dialogAction"]["fulfillmentState"], "Fulfilled");
    let content = reply["dialogAction"]["message"]["content"].as_str().unwrap();
    assert!(content.starts_with("Here is what I have found: \""));
    assert!(content.contains("Jobs are coming back to Michigan"));
}

#[tokio::test]
async fn query_without_matches_returns_apology() {
    let h = Harness::new(ScriptedNlp::new());
    let addr = start_server(&h).await;

    let reply: Value = reqwest::Client::new()
        .post(format!("http://{}/query", addr))
        .json(&json!({ "inputTranscript": "anything at all" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reply["dialogAction"]["message"]["content"], APOLOGY);
}

#[tokio::test]
async fn ingest_without_records_is_bad_request() {
    let h = Harness::new(ScriptedNlp::new());
    let addr = start_server(&h).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/ingest", addr))
        .json(&json!({ "Records": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn malformed_event_is_bad_request() {
    let h = Harness::new(ScriptedNlp::new());
    let addr = start_server(&h).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/ingest", addr))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn handler_failure_maps_to_500() {
    let h = Harness::new(ScriptedNlp::new());
    let addr = start_server(&h).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/ingest", addr))
        .json(&s3_event("missing.docx"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "handler_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("object not found"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let h = Harness::new(ScriptedNlp::new());
    let addr = start_server(&h).await;

    let resp = reqwest::get(format!("http://{}/reindex", addr)).await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(body["error"]["message"], "no route for /reindex");
}

#[tokio::test]
async fn query_without_transcript_is_bad_request() {
    let h = Harness::new(ScriptedNlp::new());
    let addr = start_server(&h).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/query", addr))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("inputTranscript"));
    assert_eq!(h.nlp.calls(), 0);
}
