use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::Router;
use ragchat::api::build_router;
use ragchat::api::handlers::AppState;
use ragchat::llm::GenerationRequest;
use ragchat::llm::StreamingResponse;
use ragchat::llm::TextGenerator;
use ragchat::models::ChatMessage;
use ragchat::models::EvidenceMatch;
use ragchat::models::Role;
use ragchat::rag::prompts::DEFAULT_NO_EVIDENCE_INSTRUCTION;
use ragchat::rag::prompts::DEFAULT_SYSTEM_INSTRUCTION;
use ragchat::rag::ChatOrchestrator;
use ragchat::rag::DocumentSearch;
use ragchat::rag::OrchestratorSettings;
use ragchat::rag::SearchOptions;
use ragchat::RagChatError;
use ragchat::Result;
use tower::ServiceExt;

const SSE_BODY: &str = "data: {\"response\":\"The routing table\"}\n\ndata: [DONE]\n\n";

/// Search fake returning fixed matches, or failing when `matches` is `None`
struct FakeSearch {
    matches: Option<Vec<EvidenceMatch>>,
    calls: Mutex<Vec<(String, SearchOptions)>>,
}

impl FakeSearch {
    fn returning(matches: Vec<EvidenceMatch>) -> Arc<Self> {
        Arc::new(Self {
            matches: Some(matches),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            matches: None,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl DocumentSearch for FakeSearch {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<EvidenceMatch>> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), options.clone()));
        self.matches
            .clone()
            .ok_or_else(|| RagChatError::Retrieval("upstream returned 503".to_string()))
    }
}

/// Generation fake that records requests and streams a canned SSE body
#[derive(Default)]
struct FakeGenerator {
    requests: Mutex<Vec<GenerationRequest>>,
    calls: AtomicUsize,
    fail: bool,
}

impl FakeGenerator {
    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<StreamingResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        if self.fail {
            return Err(RagChatError::Generation("model unavailable".to_string()));
        }
        let (first, rest) = SSE_BODY.split_at(20);
        Ok(StreamingResponse::from_chunks([first.to_string(), rest.to_string()]))
    }
}

fn app(search: Arc<FakeSearch>, generator: Arc<FakeGenerator>) -> Router {
    let orchestrator = ChatOrchestrator::new(OrchestratorSettings::default(), search, generator);
    build_router(
        AppState {
            orchestrator: Arc::new(orchestrator),
        },
        false,
        None,
    )
}

fn post_chat(body: &str) -> Request {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_chat_end_to_end_with_evidence() {
    let search = FakeSearch::returning(vec![EvidenceMatch::new(
        "routing.md",
        0.42,
        &["The routing table maps prefixes to next hops."],
    )]);
    let generator = Arc::new(FakeGenerator::default());

    let response = app(search.clone(), generator.clone())
        .oneshot(post_chat(
            r#"{"messages":[{"role":"user","content":"show me the routing table"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    assert_eq!(body_string(response).await, SSE_BODY);

    let calls = search.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "show me the routing table");
    assert_eq!(calls[0].1.max_num_results, 3);
    assert!(calls[0].1.rewrite_query);
    assert!((calls[0].1.score_threshold - 0.3).abs() < f64::EPSILON);

    let requests = generator.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.max_tokens, 1024);
    assert!(request.stream);
    assert_eq!(request.messages.len(), 3);
    assert_eq!(request.messages[0], ChatMessage::system(DEFAULT_SYSTEM_INSTRUCTION));
    assert_eq!(request.messages[1].role, Role::System);
    assert!(request.messages[1]
        .content
        .contains("Source: routing.md\nScore: 0.42\n\nThe routing table maps prefixes to next hops."));
    assert!(request.messages[1]
        .content
        .contains("\n\n\n---\n\n| Filename | Score |\n|----------|-------|\n| routing.md | 0.420 |"));
    assert_eq!(request.messages[2], ChatMessage::user("show me the routing table"));
}

#[tokio::test]
async fn test_chat_without_evidence() {
    let generator = Arc::new(FakeGenerator::default());

    let response = app(FakeSearch::returning(vec![]), generator.clone())
        .oneshot(post_chat(
            r#"{"messages":[{"role":"system","content":"Be terse."},{"role":"user","content":"hi"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let requests = generator.requests.lock().unwrap();
    let messages = &requests[0].messages;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0], ChatMessage::system("Be terse."));
    assert_eq!(messages[1], ChatMessage::system(DEFAULT_NO_EVIDENCE_INSTRUCTION));
    assert!(!messages[1].content.contains("| Filename |"));
    assert_eq!(messages[2], ChatMessage::user("hi"));
}

#[tokio::test]
async fn test_missing_messages_is_empty_conversation() {
    let search = FakeSearch::returning(vec![]);
    let generator = Arc::new(FakeGenerator::default());

    let response = app(search.clone(), generator.clone())
        .oneshot(post_chat("{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(search.calls.lock().unwrap()[0].0, "");

    let requests = generator.requests.lock().unwrap();
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(requests[0].messages[0].content, DEFAULT_SYSTEM_INSTRUCTION);
}

#[tokio::test]
async fn test_malformed_body_is_empty_conversation() {
    let generator = Arc::new(FakeGenerator::default());

    let response = app(FakeSearch::returning(vec![]), generator.clone())
        .oneshot(post_chat("{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(generator.requests.lock().unwrap()[0].messages.len(), 2);
}

#[tokio::test]
async fn test_retrieval_failure_returns_generic_error() {
    let generator = Arc::new(FakeGenerator::default());

    let response = app(FakeSearch::failing(), generator.clone())
        .oneshot(post_chat(r#"{"messages":[{"role":"user","content":"hi"}]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(
        body_string(response).await,
        r#"{"error":"Failed to process request"}"#
    );
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_generation_failure_returns_same_generic_error() {
    let generator = FakeGenerator::failing();

    let response = app(FakeSearch::returning(vec![]), generator.clone())
        .oneshot(post_chat(r#"{"messages":[{"role":"user","content":"hi"}]}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_string(response).await,
        r#"{"error":"Failed to process request"}"#
    );
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_on_chat_is_method_not_allowed() {
    let request = Request::builder()
        .method("GET")
        .uri("/api/chat")
        .body(Body::empty())
        .unwrap();

    let response = app(FakeSearch::returning(vec![]), Arc::new(FakeGenerator::default()))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_api_path_is_not_found() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/unknown")
        .body(Body::empty())
        .unwrap();

    let response = app(FakeSearch::returning(vec![]), Arc::new(FakeGenerator::default()))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder()
        .method("GET")
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();

    let response = app(FakeSearch::returning(vec![]), Arc::new(FakeGenerator::default()))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("\"status\":\"healthy\""));
}

#[tokio::test]
async fn test_static_assets_served_outside_api() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>chat</h1>").unwrap();

    let orchestrator = ChatOrchestrator::new(
        OrchestratorSettings::default(),
        FakeSearch::returning(vec![]),
        Arc::new(FakeGenerator::default()),
    );
    let router = build_router(
        AppState {
            orchestrator: Arc::new(orchestrator),
        },
        false,
        dir.path().to_str(),
    );

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "<h1>chat</h1>");
}

fn app_with_assets(dir: &std::path::Path) -> Router {
    let orchestrator = ChatOrchestrator::new(
        OrchestratorSettings::default(),
        FakeSearch::returning(vec![]),
        Arc::new(FakeGenerator::default()),
    );
    build_router(
        AppState {
            orchestrator: Arc::new(orchestrator),
        },
        false,
        dir.to_str(),
    )
}

fn get(uri: &str) -> Request {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_bare_api_path_goes_to_assets() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("api"), "asset named api").unwrap();

    let response = app_with_assets(dir.path()).oneshot(get("/api")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "asset named api");
}

#[tokio::test]
async fn test_api_prefix_never_falls_through_to_assets() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("api")).unwrap();
    std::fs::write(dir.path().join("api").join("missing"), "should not be served").unwrap();

    for uri in ["/api/", "/api/missing"] {
        let response = app_with_assets(dir.path()).oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body_string(response).await, "Not found", "{uri}");
    }
}

#[tokio::test]
async fn test_null_content_does_not_drop_conversation() {
    let generator = Arc::new(FakeGenerator::default());

    let response = app(FakeSearch::returning(vec![]), generator.clone())
        .oneshot(post_chat(
            r#"{"messages":[{"role":"assistant","content":null},{"role":"user","content":"hi"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let requests = generator.requests.lock().unwrap();
    let messages = &requests[0].messages;
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2], ChatMessage::assistant(""));
    assert_eq!(messages[3], ChatMessage::user("hi"));
}
