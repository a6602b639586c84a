//! HTTP routes and handlers

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chatrelay_core::{ChatMessage, MessagePart, Role, StreamEvent};
use chatrelay_session::{
    derive_title, ChatRecord, EventSink, MessageRecord, TurnOrchestrator, TurnSummary, Visibility,
};
use chatrelay_upstream::{build_input, ResponseRequest};
use chrono::Utc;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{bearer_token, Session};

/// Request body cap for the chat route
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/v1/chat", post(create_turn).delete(delete_chat))
        .route("/v1/chat/:id/stream", get(resume_stream))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .fallback(fallback)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

/// Chat turn request
#[derive(Debug, Deserialize)]
struct ChatRequest {
    id: String,
    message: IncomingMessage,
    #[serde(default)]
    visibility: Option<Visibility>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    id: String,
    parts: Vec<MessagePart>,
}

/// Main chat handler: validates, persists the user message, spawns the
/// turn, and returns the outward SSE stream.
async fn create_turn(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    metrics::counter!("chatrelay_requests_total").increment(1);

    let request: ChatRequest =
        serde_json::from_value(payload).map_err(|_| ApiError::bad_request())?;
    if request.id.is_empty() || request.message.id.is_empty() || request.message.parts.is_empty() {
        return Err(ApiError::bad_request());
    }

    let session = authenticate(&state, &headers).await?;

    let decision = state
        .limiter
        .check(&session.user_id, session.user_type)
        .await
        .map_err(ApiError::offline)?;
    if !decision.allowed {
        warn!(
            user_id = %session.user_id,
            recent = decision.recent_messages,
            limit = decision.limit,
            "rate limit exceeded"
        );
        return Err(ApiError::rate_limited());
    }

    let user_message = ChatMessage::new(Role::User, request.message.parts.clone());

    match state
        .store
        .get_chat(&request.id)
        .await
        .map_err(ApiError::offline)?
    {
        Some(chat) => {
            if chat.user_id != session.user_id {
                return Err(ApiError::forbidden());
            }
        }
        None => {
            state
                .store
                .save_chat(ChatRecord {
                    id: request.id.clone(),
                    user_id: session.user_id.clone(),
                    title: derive_title(&user_message),
                    visibility: request.visibility.unwrap_or(Visibility::Private),
                    created_at: Utc::now(),
                    last_usage: None,
                })
                .await
                .map_err(ApiError::offline)?;
        }
    }

    state
        .store
        .save_messages(vec![MessageRecord {
            id: request.message.id.clone(),
            chat_id: request.id.clone(),
            role: Role::User,
            parts: request.message.parts.clone(),
            created_at: Utc::now(),
        }])
        .await
        .map_err(ApiError::offline)?;

    let history: Vec<ChatMessage> = state
        .store
        .messages_for_chat(&request.id)
        .await
        .map_err(ApiError::offline)?
        .into_iter()
        .map(|record| ChatMessage::new(record.role, record.parts))
        .collect();

    let input = build_input(state.config.upstream.system_prompt.as_deref(), &history);
    let upstream_request =
        ResponseRequest::streaming(state.config.upstream.model.clone(), input);

    let stream_id = Uuid::new_v4().to_string();
    state
        .store
        .create_stream_id(&stream_id, &request.id)
        .await
        .map_err(ApiError::offline)?;

    info!(chat_id = %request.id, stream_id = %stream_id, "starting assistant turn");

    let outward = match &state.registry {
        Some(registry) => {
            let publisher = registry.open(&stream_id);
            let subscriber = registry
                .subscribe(&stream_id)
                .expect("stream registered above");
            spawn_turn(state.clone(), request.id.clone(), upstream_request, Box::new(publisher));
            subscriber
        }
        None => {
            let (sink, stream) = chatrelay_session::channel_sink();
            spawn_turn(state.clone(), request.id.clone(), upstream_request, Box::new(sink));
            stream
        }
    };

    Ok(sse_response(outward))
}

/// Run one turn to completion on its own task
fn spawn_turn(
    state: AppState,
    chat_id: String,
    upstream_request: ResponseRequest,
    mut sink: Box<dyn EventSink>,
) {
    tokio::spawn(async move {
        match state.client.stream_response(&upstream_request).await {
            Ok(upstream) => {
                let orchestrator = TurnOrchestrator::new();
                match orchestrator
                    .run(upstream, &mut sink, state.enricher.as_ref())
                    .await
                {
                    Ok(summary) => persist_turn(&state, &chat_id, summary).await,
                    Err(e) => error!(chat_id = %chat_id, error = %e, "assistant turn failed"),
                }
            }
            Err(e) => {
                // The turn never opened; surface the failure on the stream
                error!(chat_id = %chat_id, error = %e, "upstream connect failed");
                let _ = sink.emit(StreamEvent::Start);
                let _ = sink.emit(StreamEvent::Error {
                    error_text: e.to_string(),
                });
            }
        }
    });
}

/// Persist the assistant message and last usage, best-effort
async fn persist_turn(state: &AppState, chat_id: &str, summary: TurnSummary) {
    let parts: Vec<MessagePart> = summary
        .text_blocks
        .iter()
        .filter(|block| !block.text.is_empty())
        .map(|block| MessagePart::text(block.text.as_str()))
        .collect();

    if !parts.is_empty() {
        let record = MessageRecord {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            role: Role::Assistant,
            parts,
            created_at: Utc::now(),
        };
        if let Err(e) = state.store.save_messages(vec![record]).await {
            warn!(chat_id = %chat_id, error = %e, "unable to persist assistant message");
        }
    }

    if let Some(usage) = summary.usage {
        if let Err(e) = state.store.update_chat_last_usage(chat_id, usage).await {
            warn!(chat_id = %chat_id, error = %e, "unable to persist last usage");
        }
    }
}

/// Resume the chat's most recent stream: buffered replay plus live tail
async fn resume_stream(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let session = authenticate(&state, &headers).await?;

    let chat = state
        .store
        .get_chat(&chat_id)
        .await
        .map_err(ApiError::offline)?
        .ok_or_else(ApiError::not_found)?;
    if chat.user_id != session.user_id {
        return Err(ApiError::forbidden());
    }

    let registry = state.registry.as_ref().ok_or_else(ApiError::not_found)?;
    let stream_id = state
        .store
        .latest_stream_id(&chat_id)
        .await
        .map_err(ApiError::offline)?
        .ok_or_else(ApiError::not_found)?;
    let events = registry
        .subscribe(&stream_id)
        .ok_or_else(ApiError::not_found)?;

    info!(chat_id = %chat_id, stream_id = %stream_id, "resuming stream");
    Ok(sse_response(events))
}

#[derive(Debug, Deserialize)]
struct DeleteParams {
    id: Option<String>,
}

/// Owner-only chat deletion
async fn delete_chat(
    State(state): State<AppState>,
    Query(params): Query<DeleteParams>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = params
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(ApiError::bad_request)?;

    let session = authenticate(&state, &headers).await?;

    match state.store.get_chat(&id).await.map_err(ApiError::offline)? {
        Some(chat) if chat.user_id == session.user_id => {}
        _ => return Err(ApiError::forbidden()),
    }

    if let Some(registry) = &state.registry {
        if let Ok(Some(stream_id)) = state.store.latest_stream_id(&id).await {
            registry.remove(&stream_id);
        }
    }

    state.store.delete_chat(&id).await.map_err(ApiError::offline)?;
    Ok(Json(json!({ "id": id })))
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Session, ApiError> {
    let token = bearer_token(headers).ok_or_else(ApiError::unauthorized)?;
    state
        .sessions
        .authenticate(token)
        .await
        .ok_or_else(ApiError::unauthorized)
}

/// Wrap an event stream as an SSE response
fn sse_response(events: BoxStream<'static, StreamEvent>) -> Response {
    let body = Body::from_stream(
        events.map(|event| Ok::<_, Infallible>(event.to_sse_frame())),
    );

    let mut response = Response::new(body);
    response.headers_mut().insert(
        "Content-Type",
        HeaderValue::from_static("text/event-stream"),
    );
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-cache"));
    response
        .headers_mut()
        .insert("Connection", HeaderValue::from_static("keep-alive"));
    response
}

async fn fallback() -> ApiError {
    ApiError::not_found()
}

/// Request-level error with the client-facing taxonomy
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request:api",
            message: "The request body could not be processed".into(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "unauthorized:chat",
            message: "Sign in to continue".into(),
        }
    }

    fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: "forbidden:chat",
            message: "This chat belongs to another user".into(),
        }
    }

    fn rate_limited() -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            code: "rate_limit:chat",
            message: "Daily message limit reached".into(),
        }
    }

    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found:chat",
            message: "Nothing to serve here".into(),
        }
    }

    fn offline(err: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "offline:chat",
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        metrics::counter!("chatrelay_request_errors_total", "code" => self.code).increment(1);
        let body = json!({
            "code": self.code,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}
