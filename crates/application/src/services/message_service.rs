//! 消息服务
//!
//! 发送路径由仓库事务保证"会话仍 active 才落库"；
//! 历史在解除匹配后仍然可读，只是不再接受新消息。

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use domain::{
    ConversationId, DomainError, Message, MessageContent, MessageId, RepositoryError, UserId,
};

use crate::{
    clock::Clock,
    dto::MessageDto,
    error::ApplicationError,
    realtime::{RealtimeDispatcher, RealtimeEvent},
    repository::{ConversationRepository, MessageRepository, UserRepository},
    services::NotificationService,
};

/// 历史分页上限；超出会被收敛而不是报错。
const MAX_PAGE_SIZE: i64 = 100;
const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

pub struct MessageServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub conversation_repository: Arc<dyn ConversationRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub notification_service: Arc<NotificationService>,
    pub dispatcher: Arc<dyn RealtimeDispatcher>,
    pub clock: Arc<dyn Clock>,
}

pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    /// 发送消息。
    ///
    /// 应用层的 active 预检只是快速失败；与 unmatch 的并发竞争
    /// 由仓库在事务内锁行复核解决，冲突翻译为"会话已解除"。
    pub async fn send(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        request: SendMessageRequest,
    ) -> Result<MessageDto, ApplicationError> {
        let conversation = self
            .deps
            .conversation_repository
            .find_by_id(conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound)?;
        if !conversation.has_participant(sender_id) {
            return Err(DomainError::NotAuthorized.into());
        }
        if !conversation.is_active() {
            return Err(DomainError::ConversationUnmatched.into());
        }

        let content = MessageContent::new(&request.content)?;
        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            conversation_id,
            sender_id,
            content,
            self.deps.clock.now(),
        );

        let (stored, was_first) = match self
            .deps
            .message_repository
            .create_in_conversation(message)
            .await
        {
            Ok(result) => result,
            Err(RepositoryError::Conflict) => {
                return Err(DomainError::ConversationUnmatched.into())
            }
            Err(RepositoryError::NotFound) => {
                return Err(DomainError::ConversationNotFound.into())
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(
            message_id = %stored.id,
            conversation_id = %conversation_id,
            sender_id = %sender_id,
            first = was_first,
            "message sent"
        );

        // 落库之后的副作用都是尽力而为
        if let Some(recipient) = conversation.other_participant(sender_id) {
            let sender_name = self.display_name(sender_id).await;
            if let Err(err) = self
                .deps
                .notification_service
                .notify_message_received(
                    recipient,
                    &sender_name,
                    conversation_id,
                    stored.id,
                    sender_id,
                    was_first,
                )
                .await
            {
                tracing::warn!(message_id = %stored.id, error = %err, "message notification failed");
            }
        }

        for participant in [
            conversation.participant_low_id,
            conversation.participant_high_id,
        ] {
            self.deps
                .dispatcher
                .emit(
                    participant,
                    RealtimeEvent::NewMessage {
                        conversation_id,
                        message: stored.clone(),
                    },
                )
                .await;
        }

        let sender = self.deps.user_repository.find_profile(sender_id).await?;
        Ok(MessageDto::from_message(&stored, sender))
    }

    /// 分页读取历史，按时间倒序。unmatched 会话仍可读。
    pub async fn history(
        &self,
        conversation_id: ConversationId,
        viewer_id: UserId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<MessageDto>, ApplicationError> {
        self.ensure_participant(conversation_id, viewer_id).await?;

        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);

        let messages = self
            .deps
            .message_repository
            .list_for_conversation(conversation_id, limit, offset)
            .await?;

        let mut dtos = Vec::with_capacity(messages.len());
        for message in &messages {
            let sender = self
                .deps
                .user_repository
                .find_profile(message.sender_id)
                .await?;
            dtos.push(MessageDto::from_message(message, sender));
        }
        Ok(dtos)
    }

    /// 把对方发来的未读消息全部置为已读，返回条数。
    /// 有实际更新时给对方发 `messages_read`。
    pub async fn mark_read(
        &self,
        conversation_id: ConversationId,
        viewer_id: UserId,
    ) -> Result<u64, ApplicationError> {
        let conversation = self.ensure_participant(conversation_id, viewer_id).await?;

        let count = self
            .deps
            .message_repository
            .mark_read(conversation_id, viewer_id)
            .await?;

        if count > 0 {
            if let Some(other) = conversation.other_participant(viewer_id) {
                self.deps
                    .dispatcher
                    .emit(
                        other,
                        RealtimeEvent::MessagesRead {
                            conversation_id,
                            reader_id: viewer_id,
                        },
                    )
                    .await;
            }
        }

        Ok(count)
    }

    pub async fn unread_count(
        &self,
        conversation_id: ConversationId,
        viewer_id: UserId,
    ) -> Result<u64, ApplicationError> {
        self.ensure_participant(conversation_id, viewer_id).await?;
        Ok(self
            .deps
            .message_repository
            .unread_count(conversation_id, viewer_id)
            .await?)
    }

    /// 所有 active 会话的未读总数（角标用）。
    pub async fn total_unread_count(&self, viewer_id: UserId) -> Result<u64, ApplicationError> {
        Ok(self
            .deps
            .message_repository
            .total_unread_count(viewer_id)
            .await?)
    }

    async fn ensure_participant(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<domain::Conversation, ApplicationError> {
        let conversation = self
            .deps
            .conversation_repository
            .find_by_id(conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound)?;
        if !conversation.has_participant(user_id) {
            return Err(DomainError::NotAuthorized.into());
        }
        Ok(conversation)
    }

    async fn display_name(&self, user_id: UserId) -> String {
        match self.deps.user_repository.find_profile(user_id).await {
            Ok(Some(profile)) => profile.display_name,
            _ => "Someone".to_owned(),
        }
    }
}
