//! 会话服务
//!
//! 会话只在双向匹配时产生，解除匹配是终态。
//! 唯一性由存储层的规范对约束兜底，这里负责冲突后的对账。

use std::sync::Arc;

use uuid::Uuid;

use domain::{
    canonical_pair, Conversation, ConversationId, ConversationStatus, DomainError, LikeId,
    RepositoryError, UserId, UserProfile,
};

use crate::{
    clock::Clock,
    dto::{ConversationDto, ConversationSummaryDto, MessageDto},
    error::ApplicationError,
    realtime::{RealtimeDispatcher, RealtimeEvent},
    repository::{ConversationRepository, MessageRepository, UserRepository},
};

pub struct ConversationServiceDependencies {
    pub conversation_repository: Arc<dyn ConversationRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub dispatcher: Arc<dyn RealtimeDispatcher>,
    pub clock: Arc<dyn Clock>,
}

pub struct ConversationService {
    deps: ConversationServiceDependencies,
}

impl ConversationService {
    pub fn new(deps: ConversationServiceDependencies) -> Self {
        Self { deps }
    }

    /// 双向匹配确立时创建会话。
    ///
    /// 并发的两次匹配只会有一次插入成功；冲突方重新读取既有会话
    /// 并以 `ConversationExists` 返回，调用方可视其为成功。
    pub async fn create_for_match(
        &self,
        user_a: UserId,
        user_b: UserId,
        origin_like_id: LikeId,
    ) -> Result<Conversation, ApplicationError> {
        let conversation = Conversation::new(
            ConversationId::from(Uuid::new_v4()),
            user_a,
            user_b,
            origin_like_id,
            self.deps.clock.now(),
        )?;

        match self.deps.conversation_repository.create(conversation).await {
            Ok(created) => {
                tracing::info!(
                    conversation_id = %created.id,
                    low = %created.participant_low_id,
                    high = %created.participant_high_id,
                    "conversation created"
                );
                Ok(created)
            }
            Err(RepositoryError::Conflict) => {
                let (low, high) = canonical_pair(user_a, user_b)?;
                let existing = self
                    .deps
                    .conversation_repository
                    .find_by_pair(low, high)
                    .await?
                    .ok_or(DomainError::ConversationNotFound)?;
                Err(DomainError::ConversationExists(Box::new(existing)).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// 参与者读取单个会话。
    pub async fn get(
        &self,
        id: ConversationId,
        actor: UserId,
    ) -> Result<ConversationDto, ApplicationError> {
        let conversation = self.find_for_participant(id, actor).await?;
        let participants = self.resolve_participants(&conversation).await?;
        Ok(ConversationDto::from_conversation(&conversation, participants))
    }

    /// 收件箱：会话 + 最近一条消息 + 调用者的未读数，
    /// 按 last_message_at 倒序（无消息的排最后）。
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<ConversationSummaryDto>, ApplicationError> {
        let conversations = self
            .deps
            .conversation_repository
            .list_for_user(user_id, status)
            .await?;

        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in &conversations {
            let participants = self.resolve_participants(conversation).await?;
            let last_message = match self.deps.message_repository.last_message(conversation.id).await? {
                Some(message) => {
                    let sender = self
                        .deps
                        .user_repository
                        .find_profile(message.sender_id)
                        .await?;
                    Some(MessageDto::from_message(&message, sender))
                }
                None => None,
            };
            let unread_count = self
                .deps
                .message_repository
                .unread_count(conversation.id, user_id)
                .await?;
            summaries.push(ConversationSummaryDto {
                conversation: ConversationDto::from_conversation(conversation, participants),
                last_message,
                unread_count,
            });
        }
        Ok(summaries)
    }

    /// 解除匹配：会话与 origin like 在同一事务内转为 unmatched，
    /// 然后把 `conversation_unmatched` 发给双方（含发起者本人）。
    pub async fn unmatch(
        &self,
        id: ConversationId,
        actor: UserId,
    ) -> Result<ConversationDto, ApplicationError> {
        let mut conversation = self.find_for_participant(id, actor).await?;
        // 领域校验先行，存储层条件更新兜底并发
        conversation.unmatch(actor, self.deps.clock.now())?;

        let updated = match self
            .deps
            .conversation_repository
            .unmatch(id, conversation.updated_at)
            .await
        {
            Ok(updated) => updated,
            Err(RepositoryError::Conflict) => return Err(DomainError::AlreadyUnmatched.into()),
            Err(RepositoryError::NotFound) => {
                return Err(DomainError::ConversationNotFound.into())
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(conversation_id = %id, unmatched_by = %actor, "conversation unmatched");

        for participant in [updated.participant_low_id, updated.participant_high_id] {
            self.deps
                .dispatcher
                .emit(
                    participant,
                    RealtimeEvent::ConversationUnmatched {
                        conversation_id: id,
                        unmatched_by: actor,
                    },
                )
                .await;
        }

        let participants = self.resolve_participants(&updated).await?;
        Ok(ConversationDto::from_conversation(&updated, participants))
    }

    /// 输入状态中继等场景：校验参与资格并返回对方的用户标识。
    pub async fn other_participant(
        &self,
        id: ConversationId,
        actor: UserId,
    ) -> Result<UserId, ApplicationError> {
        let conversation = self.find_for_participant(id, actor).await?;
        conversation
            .other_participant(actor)
            .ok_or_else(|| DomainError::NotAuthorized.into())
    }

    pub(crate) async fn find_for_participant(
        &self,
        id: ConversationId,
        actor: UserId,
    ) -> Result<Conversation, ApplicationError> {
        let conversation = self
            .deps
            .conversation_repository
            .find_by_id(id)
            .await?
            .ok_or(DomainError::ConversationNotFound)?;
        if !conversation.has_participant(actor) {
            return Err(DomainError::NotAuthorized.into());
        }
        Ok(conversation)
    }

    async fn resolve_participants(
        &self,
        conversation: &Conversation,
    ) -> Result<Vec<UserProfile>, ApplicationError> {
        let mut participants = Vec::with_capacity(2);
        for user_id in [
            conversation.participant_low_id,
            conversation.participant_high_id,
        ] {
            // 资料归外部协作方维护；缺失时不阻断会话读取
            if let Some(profile) = self.deps.user_repository.find_profile(user_id).await? {
                participants.push(profile);
            }
        }
        Ok(participants)
    }
}
