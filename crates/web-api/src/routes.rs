//! REST 路由
//!
//! 除 /health 外都要求 `Authorization: Bearer` 身份。
//! 调用者身份一律取自 token，请求体里不接受 actor 字段。

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::dto::{ConversationDto, ConversationSummaryDto, LikeDto, MessageDto, NotificationDto};
use application::services::{
    LikeDecision, SendLikeRequest, SendMessageRequest, UpdateLikeStatusRequest,
};
use domain::{ConversationId, ConversationStatus, LikeId, LikeStatus, NotificationId, UserId};

use crate::{error::ApiError, state::AppState, websocket};

const MAX_PAGE_SIZE: i64 = 100;
const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize)]
struct SendLikePayload {
    receiver_id: Uuid,
    /// 省略或 pending 表示正常 like；rejected 表示静默拒绝
    status: Option<LikeStatus>,
}

#[derive(Debug, Deserialize)]
struct UpdateLikePayload {
    status: LikeDecision,
}

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ConversationsQuery {
    status: Option<ConversationStatus>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct NotificationsQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    unread_only: Option<bool>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/likes/send", post(send_like))
        .route("/likes/received", get(received_likes))
        .route("/likes/received/count", get(received_like_count))
        .route("/likes/sent", get(sent_likes))
        .route("/likes/{like_id}", patch(update_like_status))
        .route("/conversations", get(list_conversations))
        .route("/conversations/unread/count", get(total_unread_count))
        .route("/conversations/{conversation_id}", get(get_conversation))
        .route("/conversations/{conversation_id}/unmatch", post(unmatch))
        .route(
            "/conversations/{conversation_id}/messages",
            post(send_message).get(message_history),
        )
        .route("/conversations/{conversation_id}/read", post(mark_messages_read))
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(notification_unread_count))
        .route("/notifications/stats", get(notification_stats))
        .route("/notifications/mark-all-read", patch(mark_all_notifications_read))
        .route("/notifications/{notification_id}/read", patch(mark_notification_read))
        .route("/ws", get(websocket::websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

fn authed(state: &AppState, headers: &HeaderMap) -> Result<UserId, ApiError> {
    state.jwt_service.extract_user_from_headers(headers)
}

async fn send_like(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SendLikePayload>,
) -> Result<(StatusCode, Json<LikeDto>), ApiError> {
    let sender = authed(&state, &headers)?;
    let receiver_id = UserId::from(payload.receiver_id);

    // 显式区分两条创建路径：正常 like 与静默拒绝
    let dto = match payload.status {
        None | Some(LikeStatus::Pending) => {
            state
                .like_service
                .send_like(sender, SendLikeRequest { receiver_id })
                .await?
        }
        Some(LikeStatus::Rejected) => state.like_service.pass_silently(sender, receiver_id).await?,
        Some(other) => {
            return Err(ApiError::bad_request(format!(
                "status '{other}' is not a valid creation status"
            )))
        }
    };

    Ok((StatusCode::CREATED, Json(dto)))
}

async fn update_like_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(like_id): Path<Uuid>,
    Json(payload): Json<UpdateLikePayload>,
) -> Result<Json<LikeDto>, ApiError> {
    let actor = authed(&state, &headers)?;
    let dto = state
        .like_service
        .update_like_status(
            LikeId::from(like_id),
            actor,
            UpdateLikeStatusRequest {
                status: payload.status,
            },
        )
        .await?;
    Ok(Json(dto))
}

async fn received_likes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<LikeDto>>, ApiError> {
    let user = authed(&state, &headers)?;
    Ok(Json(state.like_service.list_received(user).await?))
}

async fn received_like_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<JsonValue>, ApiError> {
    let user = authed(&state, &headers)?;
    let count = state.like_service.pending_count(user).await?;
    Ok(Json(json!({ "count": count })))
}

async fn sent_likes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<LikeDto>>, ApiError> {
    let user = authed(&state, &headers)?;
    Ok(Json(state.like_service.list_sent(user).await?))
}

async fn list_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ConversationsQuery>,
) -> Result<Json<Vec<ConversationSummaryDto>>, ApiError> {
    let user = authed(&state, &headers)?;
    Ok(Json(
        state
            .conversation_service
            .list_for_user(user, query.status)
            .await?,
    ))
}

async fn get_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<ConversationDto>, ApiError> {
    let user = authed(&state, &headers)?;
    Ok(Json(
        state
            .conversation_service
            .get(ConversationId::from(conversation_id), user)
            .await?,
    ))
}

async fn unmatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<ConversationDto>, ApiError> {
    let user = authed(&state, &headers)?;
    Ok(Json(
        state
            .conversation_service
            .unmatch(ConversationId::from(conversation_id), user)
            .await?,
    ))
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let sender = authed(&state, &headers)?;
    let dto = state
        .message_service
        .send(
            ConversationId::from(conversation_id),
            sender,
            SendMessageRequest {
                content: payload.content,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

async fn message_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let viewer = authed(&state, &headers)?;
    Ok(Json(
        state
            .message_service
            .history(
                ConversationId::from(conversation_id),
                viewer,
                query.limit,
                query.offset,
            )
            .await?,
    ))
}

async fn mark_messages_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<JsonValue>, ApiError> {
    let viewer = authed(&state, &headers)?;
    let count = state
        .message_service
        .mark_read(ConversationId::from(conversation_id), viewer)
        .await?;
    Ok(Json(json!({ "count": count })))
}

async fn total_unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<JsonValue>, ApiError> {
    let viewer = authed(&state, &headers)?;
    let count = state.message_service.total_unread_count(viewer).await?;
    Ok(Json(json!({ "count": count })))
}

async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<NotificationDto>>, ApiError> {
    let user = authed(&state, &headers)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);
    Ok(Json(
        state
            .notification_service
            .list(user, query.unread_only.unwrap_or(false), limit, offset)
            .await?,
    ))
}

async fn notification_unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<JsonValue>, ApiError> {
    let user = authed(&state, &headers)?;
    let count = state.notification_service.unread_count(user).await?;
    Ok(Json(json!({ "count": count })))
}

async fn notification_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<application::dto::NotificationStats>, ApiError> {
    let user = authed(&state, &headers)?;
    Ok(Json(state.notification_service.stats(user).await?))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<NotificationDto>, ApiError> {
    let user = authed(&state, &headers)?;
    Ok(Json(
        state
            .notification_service
            .mark_read(NotificationId::from(notification_id), user)
            .await?,
    ))
}

async fn mark_all_notifications_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<JsonValue>, ApiError> {
    let user = authed(&state, &headers)?;
    let count = state.notification_service.mark_all_read(user).await?;
    Ok(Json(json!({ "count": count })))
}
