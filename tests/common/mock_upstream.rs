// Mock upstream for testing - used by integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;

use axum::body::Body;
use axum::extract::Path;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde_json::json;
use serde_json::Value;
use tokio::sync::oneshot;

pub const ACCOUNT_ID: &str = "acc-test";
pub const RAG_NAME: &str = "sonic-helper";

/// Body sent with every simulated HTTP failure
pub const FAILURE_BODY: &str = "upstream exploded";

/// How the knowledge base search endpoint answers
#[derive(Clone)]
pub enum SearchBehavior {
    /// `success: true` with these entries as `result.data`
    Matches(Value),
    /// `success: false` with a single error entry
    Rejected { code: i64, message: String },
    /// Non-2xx status with [`FAILURE_BODY`]
    HttpError(StatusCode),
}

/// How the model run endpoint answers
#[derive(Clone)]
pub enum GenerationBehavior {
    /// Stream these chunks with the given content type
    Stream {
        content_type: &'static str,
        chunks: Vec<&'static str>,
    },
    /// Non-2xx status with [`FAILURE_BODY`]
    HttpError(StatusCode),
}

#[derive(Clone)]
pub struct MockUpstreamConfig {
    pub search: SearchBehavior,
    pub generation: GenerationBehavior,
}

impl Default for MockUpstreamConfig {
    fn default() -> Self {
        Self {
            search: SearchBehavior::Matches(json!([])),
            generation: GenerationBehavior::Stream {
                content_type: "text/event-stream",
                chunks: vec!["data: {\"response\":\"ok\"}\n\n", "data: [DONE]\n\n"],
            },
        }
    }
}

/// Everything the upstream received
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub search_bodies: Vec<Value>,
    pub run_bodies: Vec<Value>,
    pub models: Vec<String>,
    pub authorizations: Vec<String>,
}

#[derive(Clone)]
struct UpstreamState {
    config: Arc<MockUpstreamConfig>,
    recorded: Arc<Mutex<Recorded>>,
}

impl UpstreamState {
    fn record(&self, headers: &HeaderMap, update: impl FnOnce(&mut Recorded)) {
        let mut recorded = self.recorded.lock().unwrap();
        if let Some(auth) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            recorded.authorizations.push(auth.to_string());
        }
        update(&mut recorded);
    }
}

/// Search and model run APIs served from a local port
pub struct MockUpstream {
    pub base_url: String,
    recorded: Arc<Mutex<Recorded>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockUpstream {
    /// Bind to an ephemeral port on 127.0.0.1 and start serving
    pub async fn start(config: MockUpstreamConfig) -> Self {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let state = UpstreamState {
            config: Arc::new(config),
            recorded: recorded.clone(),
        };

        let app = Router::new()
            .route(
                "/accounts/:account/autorag/rags/:rag/search",
                post(search_handler),
            )
            .route("/accounts/:account/ai/run/*model", post(run_handler))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            recorded,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn recorded(&self) -> Recorded {
        self.recorded.lock().unwrap().clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Base URL of a port nothing listens on
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

async fn search_handler(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(&headers, |r| r.search_bodies.push(body));

    match &state.config.search {
        SearchBehavior::Matches(data) => Json(json!({
            "success": true,
            "errors": [],
            "messages": [],
            "result": {
                "object": "vector_store.search_results.page",
                "data": data,
                "has_more": false,
                "next_page": null
            }
        }))
        .into_response(),
        SearchBehavior::Rejected { code, message } => Json(json!({
            "success": false,
            "errors": [{ "code": code, "message": message }],
            "messages": [],
            "result": null
        }))
        .into_response(),
        SearchBehavior::HttpError(status) => (*status, FAILURE_BODY).into_response(),
    }
}

async fn run_handler(
    State(state): State<UpstreamState>,
    Path((_account, model)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(&headers, |r| {
        r.models.push(model);
        r.run_bodies.push(body);
    });

    match &state.config.generation {
        GenerationBehavior::Stream {
            content_type,
            chunks,
        } => {
            let chunks: Vec<Result<&'static str, std::io::Error>> =
                chunks.iter().copied().map(Ok).collect();
            (
                [(CONTENT_TYPE, *content_type)],
                Body::from_stream(futures::stream::iter(chunks)),
            )
                .into_response()
        }
        GenerationBehavior::HttpError(status) => (*status, FAILURE_BODY).into_response(),
    }
}
