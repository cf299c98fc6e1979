//! WebSocket 接入
//!
//! 握手用 `?token=` 携带 JWT 认证，成功后把连接注册进
//! `ConnectionRegistry`，此后该用户的全部实时事件经由
//! mpsc 通道转发到这条 socket。输入状态（typing）由客户端
//! 上行、服务端校验参与资格后中继给对方，不落库。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use application::realtime::{RealtimeDispatcher, RealtimeEvent};
use domain::{ConversationId, UserId};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    /// JWT access token
    pub token: String,
}

/// 客户端上行消息；事件名与下行事件同一命名空间。
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "payload")]
enum ClientMessage {
    #[serde(rename = "typing:start")]
    TypingStart { conversation_id: Uuid },
    #[serde(rename = "typing:stop")]
    TypingStop { conversation_id: Uuid },
    #[serde(rename = "ping")]
    Ping,
}

pub async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WebSocketQuery>,
) -> Result<Response, StatusCode> {
    let claims = match state.jwt_service.verify_token(&query.token) {
        Ok(claims) => claims,
        Err(_) => {
            warn!("websocket upgrade rejected: invalid token");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };
    let user_id = UserId::from(claims.user_id);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user_id, state)))
}

async fn handle_socket(socket: WebSocket, user_id: UserId, state: AppState) {
    info!(%user_id, "websocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (connection_id, mut events) = state.registry.register(user_id).await;

    // 下行任务：注册表推来的事件序列化成文本帧
    let send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(%user_id, error = %err, "failed to serialize realtime event");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
        debug!(%user_id, %connection_id, "websocket send task finished");
    });

    // 上行任务：typing 中继与心跳
    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(WsMessage::Text(text)) => {
                    handle_client_message(&recv_state, user_id, text.as_str()).await;
                }
                Ok(WsMessage::Close(_)) => {
                    debug!(%user_id, "websocket closed by client");
                    break;
                }
                Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) | Ok(WsMessage::Binary(_)) => {}
                Err(err) => {
                    debug!(%user_id, error = %err, "websocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    state.registry.unregister(user_id, connection_id).await;
    info!(%user_id, %connection_id, "websocket connection cleaned up");
}

async fn handle_client_message(state: &AppState, user_id: UserId, text: &str) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            debug!(%user_id, error = %err, "unparseable client message ignored");
            return;
        }
    };

    match message {
        ClientMessage::TypingStart { conversation_id } => {
            relay_typing(state, user_id, ConversationId::from(conversation_id), true).await;
        }
        ClientMessage::TypingStop { conversation_id } => {
            relay_typing(state, user_id, ConversationId::from(conversation_id), false).await;
        }
        ClientMessage::Ping => {
            // 心跳只用于保活，不需要应答帧；注册表事件流就是存活证明
            debug!(%user_id, "ping received");
        }
    }
}

/// 参与资格校验后中继；非参与者的 typing 静默丢弃。
async fn relay_typing(state: &AppState, typer_id: UserId, conversation_id: ConversationId, start: bool) {
    let other = match state
        .conversation_service
        .other_participant(conversation_id, typer_id)
        .await
    {
        Ok(other) => other,
        Err(err) => {
            debug!(%typer_id, %conversation_id, error = %err, "typing relay refused");
            return;
        }
    };

    let event = if start {
        RealtimeEvent::TypingStart {
            conversation_id,
            typer_id,
        }
    } else {
        RealtimeEvent::TypingStop {
            conversation_id,
            typer_id,
        }
    };
    state.registry.emit(other, event).await;
}
