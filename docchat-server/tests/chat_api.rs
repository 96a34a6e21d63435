use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use docchat_memory::InMemoryMemoryStore;
use docchat_model::MockCompletionBackend;
use docchat_rag::{HashingEmbeddingProvider, InMemoryVectorStore, IngestionPipeline, RagConfig, Retriever};
use docchat_runner::{ChatConfig, ChatOrchestrator, RetryPolicy};
use docchat_server::{AppState, app_router, ingest_on_startup};
use serde_json::Value;

struct TestServer {
    base: String,
    backend: Arc<MockCompletionBackend>,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn spawn_server(backend: MockCompletionBackend, docs_location: Option<PathBuf>) -> TestServer {
    let rag_config = RagConfig::builder().collection("docs").chunk_size(200).chunk_overlap(20).build().unwrap();
    let embedder = Arc::new(HashingEmbeddingProvider::new(64).unwrap());
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = IngestionPipeline::builder()
        .config(rag_config.clone())
        .embedding_provider(embedder.clone())
        .vector_store(store.clone())
        .build()
        .unwrap();

    let backend = Arc::new(backend);
    let orchestrator = ChatOrchestrator::builder()
        .retriever(Retriever::new(&rag_config, embedder, store))
        .memory(Arc::new(InMemoryMemoryStore::default()))
        .backend(backend.clone())
        .config(ChatConfig::builder().retry(RetryPolicy::none()).build().unwrap())
        .build()
        .unwrap();
    let state = AppState::new(orchestrator, Arc::new(pipeline), docs_location);
    ingest_on_startup(&state, false).await;
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    TestServer { base: format!("http://{addr}"), backend, handle }
}

/// `(event, data)` pairs of an SSE body, keep-alive comments skipped.
fn parse_sse(body: &str) -> Vec<(String, String)> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = Vec::new();
            for line in block.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
                }
            }
            event.map(|event| (event, data.join("\n")))
        })
        .collect()
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("docchat-server-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn health_reports_service() {
    let server = spawn_server(MockCompletionBackend::new(["x"]), None).await;
    let body: Value = reqwest::get(format!("{}/health", server.base)).await.unwrap().json().await.unwrap();
    assert_eq!(body, serde_json::json!({"status": "ok", "service": "docchat"}));
}

#[tokio::test]
async fn chat_streams_chunks_then_done_and_records_memory() {
    let server = spawn_server(MockCompletionBackend::new(["Hello", "world"]), None).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/chat/c1", server.base))
        .json(&serde_json::json!({"message": "Hi there"}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_lowercase();
    assert!(content_type.contains("text/event-stream"), "unexpected content type: {content_type}");

    let events = parse_sse(&response.text().await.unwrap());
    assert_eq!(
        events,
        [
            ("chunk".to_string(), "Hello".to_string()),
            ("chunk".to_string(), "world".to_string()),
            ("done".to_string(), r#"{"status":"completed"}"#.to_string()),
        ]
    );

    let memory: Value = client
        .get(format!("{}/api/chat/c1/messages", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages = memory["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "Hi there");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], "Helloworld");

    let cleared = client.delete(format!("{}/api/chat/c1/messages", server.base)).send().await.unwrap();
    assert_eq!(cleared.status(), reqwest::StatusCode::NO_CONTENT);
    let memory: Value = client
        .get(format!("{}/api/chat/c1/messages", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(memory["messages"].as_array().unwrap().is_empty());
}

async fn chat_events(server: &TestServer, message: &str) -> Vec<(String, String)> {
    let body = reqwest::Client::new()
        .post(format!("{}/api/chat/c1", server.base))
        .json(&serde_json::json!({"message": message}))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    parse_sse(&body)
}

#[tokio::test]
async fn chat_without_documents_answers_from_an_empty_index() {
    let server = spawn_server(MockCompletionBackend::new(["I don't know."]), None).await;

    let events = chat_events(&server, "hello").await;
    assert_eq!(events.last().map(|(event, _)| event.as_str()), Some("done"), "{events:?}");

    let request = &server.backend.requests()[0];
    assert!(request.messages[0].content.contains("No documents matched"));
}

#[tokio::test]
async fn failed_startup_ingestion_still_serves_chat() {
    let missing = std::env::temp_dir().join(format!("docchat-server-missing-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&missing);
    let server = spawn_server(MockCompletionBackend::new(["ok"]), Some(missing)).await;

    let events = chat_events(&server, "hello").await;
    assert_eq!(
        events,
        [("chunk".to_string(), "ok".to_string()), ("done".to_string(), r#"{"status":"completed"}"#.to_string())]
    );
}

#[tokio::test]
async fn empty_message_is_bad_request() {
    let server = spawn_server(MockCompletionBackend::new(["x"]), None).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/chat/c1", server.base))
        .json(&serde_json::json!({"message": "  "}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "invalid_parameters");
    assert!(server.backend.requests().is_empty());
}

#[tokio::test]
async fn backend_failure_is_an_error_event() {
    let error = docchat_model::ModelError::Rejected { provider: "mock".into(), message: "no such model".into() };
    let server = spawn_server(MockCompletionBackend::new(["x"]).failing(error), None).await;

    let body = reqwest::Client::new()
        .post(format!("{}/api/chat/c1", server.base))
        .json(&serde_json::json!({"message": "Hi"}))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let events = parse_sse(&body);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "error");
    let data: Value = serde_json::from_str(&events[0].1).unwrap();
    assert_eq!(data["code"], "completion_failed");
}

#[tokio::test]
async fn client_disconnect_cancels_the_request() {
    let backend = MockCompletionBackend::new(["a", "b", "c", "d", "e", "f"])
        .with_chunk_delay(Duration::from_millis(200));
    let server = spawn_server(backend, None).await;
    let client = reqwest::Client::new();

    let mut response = client
        .post(format!("{}/api/chat/c1", server.base))
        .json(&serde_json::json!({"message": "Tell me everything"}))
        .send()
        .await
        .unwrap();
    let first = response.chunk().await.unwrap();
    assert!(first.is_some());
    drop(response);

    let mut closed = false;
    for _ in 0..100 {
        if server.backend.open_streams() == 0 {
            closed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(closed, "backend stream still open after disconnect");

    let memory: Value = client
        .get(format!("{}/api/chat/c1/messages", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(memory["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn ingest_endpoint_indexes_the_configured_location() {
    let dir = scratch_dir("ingest");
    std::fs::write(dir.join("paris.txt"), "Paris is the capital of France").unwrap();
    std::fs::create_dir_all(dir.join("nested")).unwrap();
    std::fs::write(dir.join("nested/sky.txt"), "The sky is blue").unwrap();

    let server = spawn_server(MockCompletionBackend::new(["Paris."]), Some(dir.clone())).await;
    let client = reqwest::Client::new();

    let report: Value = client
        .post(format!("{}/api/ingest?full=true", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["documents"], 2);
    assert_eq!(report["segments"], 2);
    assert_eq!(report["dimensions"], 64);

    client
        .post(format!("{}/api/chat/c1", server.base))
        .json(&serde_json::json!({"message": "What is the capital of France?"}))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let request = &server.backend.requests()[0];
    assert!(request.messages[0].content.contains("(source: paris.txt)"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn ingest_without_location_is_conflict() {
    let server = spawn_server(MockCompletionBackend::new(["x"]), None).await;
    let response = reqwest::Client::new().post(format!("{}/api/ingest", server.base)).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
}
