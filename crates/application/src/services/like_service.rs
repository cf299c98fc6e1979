//! Like 服务
//!
//! 有向 like 账本的编排层：发送、静默拒绝、receiver 处理，
//! 以及匹配确立后的会话创建和双端通知。
//! 存在性预检只是快速失败，真正的唯一性由仓库的约束冲突兜底。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain::{DomainError, Like, LikeId, LikeStatus, RepositoryError, UserId};

use crate::{
    clock::Clock,
    dto::LikeDto,
    error::ApplicationError,
    realtime::{RealtimeDispatcher, RealtimeEvent},
    repository::{LikeRepository, UserRepository},
    services::{ConversationService, NotificationService},
};

#[derive(Debug, Clone, Deserialize)]
pub struct SendLikeRequest {
    pub receiver_id: UserId,
}

/// receiver 对 pending like 的两种处理结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeDecision {
    Accepted,
    Rejected,
}

impl LikeDecision {
    fn as_status(self) -> LikeStatus {
        match self {
            LikeDecision::Accepted => LikeStatus::Accepted,
            LikeDecision::Rejected => LikeStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLikeStatusRequest {
    pub status: LikeDecision,
}

pub struct LikeServiceDependencies {
    pub like_repository: Arc<dyn LikeRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub conversation_service: Arc<ConversationService>,
    pub notification_service: Arc<NotificationService>,
    pub dispatcher: Arc<dyn RealtimeDispatcher>,
    pub clock: Arc<dyn Clock>,
}

pub struct LikeService {
    deps: LikeServiceDependencies,
}

impl LikeService {
    pub fn new(deps: LikeServiceDependencies) -> Self {
        Self { deps }
    }

    /// 发送 like。
    ///
    /// 落库成功后的通知与实时事件都是尽力而为：
    /// 失败只记日志，不回滚已提交的 like。
    pub async fn send_like(
        &self,
        sender_id: UserId,
        request: SendLikeRequest,
    ) -> Result<LikeDto, ApplicationError> {
        let receiver_id = request.receiver_id;
        let like = self
            .prepare_like(sender_id, receiver_id, LikeStatus::Pending)
            .await?;
        let stored = self.insert_like(like).await?;

        tracing::info!(like_id = %stored.id, sender_id = %sender_id, receiver_id = %receiver_id, "like sent");

        let sender_name = self.display_name(sender_id).await;
        if let Err(err) = self
            .deps
            .notification_service
            .notify_liked_you(receiver_id, &sender_name, stored.id, sender_id)
            .await
        {
            tracing::warn!(like_id = %stored.id, error = %err, "liked-you notification failed");
        }

        self.deps
            .dispatcher
            .emit(
                receiver_id,
                RealtimeEvent::LikeReceived {
                    like_id: stored.id,
                    sender_id,
                    status: stored.status,
                    created_at: stored.created_at,
                },
            )
            .await;

        Ok(LikeDto::from(&stored))
    }

    /// 静默拒绝：直接以 rejected 落库，不产生任何通知。
    ///
    /// 若对方有一条反向的 pending like，给对方发 `like:rejected`
    /// 实时事件；那条 pending 记录保持不变。
    pub async fn pass_silently(
        &self,
        sender_id: UserId,
        target_id: UserId,
    ) -> Result<LikeDto, ApplicationError> {
        let like = self
            .prepare_like(sender_id, target_id, LikeStatus::Rejected)
            .await?;
        let stored = self.insert_like(like).await?;

        tracing::info!(like_id = %stored.id, sender_id = %sender_id, target_id = %target_id, "silent pass recorded");

        if let Some(reverse) = self
            .deps
            .like_repository
            .find_pair(target_id, sender_id)
            .await?
        {
            if reverse.status == LikeStatus::Pending {
                self.deps
                    .dispatcher
                    .emit(
                        target_id,
                        RealtimeEvent::LikeRejected {
                            rejected_by: sender_id,
                            like_id: reverse.id,
                        },
                    )
                    .await;
            }
        }

        Ok(LikeDto::from(&stored))
    }

    /// receiver 处理一条 pending like。
    ///
    /// accepted 时确立双向匹配：创建会话并给双方各发一条
    /// mutual-match 通知；并发重复创建视为成功。
    pub async fn update_like_status(
        &self,
        like_id: LikeId,
        actor: UserId,
        request: UpdateLikeStatusRequest,
    ) -> Result<LikeDto, ApplicationError> {
        let mut like = self
            .deps
            .like_repository
            .find_by_id(like_id)
            .await?
            .ok_or(DomainError::LikeNotFound)?;

        // 领域校验先行（授权 + 状态机），条件更新兜底并发
        match request.status {
            LikeDecision::Accepted => like.accept(actor, self.deps.clock.now())?,
            LikeDecision::Rejected => like.reject(actor, self.deps.clock.now())?,
        }

        let updated = match self
            .deps
            .like_repository
            .update_status_if_pending(like_id, request.status.as_status(), like.updated_at)
            .await
        {
            Ok(updated) => updated,
            Err(RepositoryError::Conflict) => return Err(DomainError::LikeAlreadyProcessed.into()),
            Err(RepositoryError::NotFound) => return Err(DomainError::LikeNotFound.into()),
            Err(err) => return Err(err.into()),
        };

        tracing::info!(like_id = %like_id, status = %updated.status, "like processed");

        self.deps
            .dispatcher
            .emit(
                updated.sender_id,
                RealtimeEvent::LikeStatusUpdated {
                    like_id: updated.id,
                    receiver_id: updated.receiver_id,
                    status: updated.status,
                },
            )
            .await;

        if updated.status == LikeStatus::Accepted {
            self.establish_match(&updated).await;
        }

        Ok(LikeDto::from(&updated))
    }

    /// 收到的 pending like 列表。
    pub async fn list_received(&self, user_id: UserId) -> Result<Vec<LikeDto>, ApplicationError> {
        let likes = self
            .deps
            .like_repository
            .list_received(user_id, LikeStatus::Pending)
            .await?;
        Ok(likes.iter().map(LikeDto::from).collect())
    }

    pub async fn list_sent(&self, user_id: UserId) -> Result<Vec<LikeDto>, ApplicationError> {
        let likes = self.deps.like_repository.list_sent(user_id).await?;
        Ok(likes.iter().map(LikeDto::from).collect())
    }

    pub async fn pending_count(&self, user_id: UserId) -> Result<u64, ApplicationError> {
        Ok(self
            .deps
            .like_repository
            .count_received(user_id, LikeStatus::Pending)
            .await?)
    }

    /// 公共前置：目标存在、有向对尚无记录、对方未曾拒绝过自己。
    async fn prepare_like(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        status: LikeStatus,
    ) -> Result<Like, ApplicationError> {
        let like = Like::new(
            LikeId::from(Uuid::new_v4()),
            sender_id,
            receiver_id,
            status,
            self.deps.clock.now(),
        )?;

        self.deps
            .user_repository
            .find_profile(receiver_id)
            .await?
            .ok_or(DomainError::ReceiverNotFound)?;

        if let Some(existing) = self
            .deps
            .like_repository
            .find_pair(sender_id, receiver_id)
            .await?
        {
            return Err(DomainError::LikeAlreadyExists(Box::new(existing)).into());
        }

        if let Some(reverse) = self
            .deps
            .like_repository
            .find_pair(receiver_id, sender_id)
            .await?
        {
            if reverse.status == LikeStatus::Rejected {
                return Err(DomainError::AlreadyRejectedByReceiver.into());
            }
        }

        Ok(like)
    }

    /// 插入；唯一约束冲突说明预检后有并发写入，重读并按已存在处理。
    async fn insert_like(&self, like: Like) -> Result<Like, ApplicationError> {
        let sender_id = like.sender_id;
        let receiver_id = like.receiver_id;
        match self.deps.like_repository.create(like).await {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::Conflict) => {
                let existing = self
                    .deps
                    .like_repository
                    .find_pair(sender_id, receiver_id)
                    .await?
                    .ok_or(DomainError::LikeNotFound)?;
                Err(DomainError::LikeAlreadyExists(Box::new(existing)).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// accepted 之后的副作用链：会话 + 双端 mutual-match 通知。
    /// 任何一步失败都不回滚已提交的状态转换。
    async fn establish_match(&self, like: &Like) {
        let conversation = match self
            .deps
            .conversation_service
            .create_for_match(like.sender_id, like.receiver_id, like.id)
            .await
        {
            Ok(conversation) => conversation,
            // 并发的重复创建：既有会话即为本次匹配的会话
            Err(ApplicationError::Domain(DomainError::ConversationExists(existing))) => *existing,
            Err(err) => {
                tracing::error!(like_id = %like.id, error = %err, "conversation creation failed after match");
                return;
            }
        };

        let sender_name = self.display_name(like.sender_id).await;
        let receiver_name = self.display_name(like.receiver_id).await;

        for (recipient, other_name, other_id) in [
            (like.sender_id, receiver_name.as_str(), like.receiver_id),
            (like.receiver_id, sender_name.as_str(), like.sender_id),
        ] {
            if let Err(err) = self
                .deps
                .notification_service
                .notify_mutual_match(recipient, other_name, other_id, conversation.id)
                .await
            {
                tracing::warn!(
                    conversation_id = %conversation.id,
                    user_id = %recipient,
                    error = %err,
                    "mutual-match notification failed"
                );
            }
        }
    }

    async fn display_name(&self, user_id: UserId) -> String {
        match self.deps.user_repository.find_profile(user_id).await {
            Ok(Some(profile)) => profile.display_name,
            _ => "Someone".to_owned(),
        }
    }
}
