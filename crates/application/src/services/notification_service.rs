//! 通知服务
//!
//! 通知记录是追加写入的，除已读标记外不再变更。
//! 每次创建都会向接收者的实时通道发出 `notification:new`。

use std::sync::Arc;

use uuid::Uuid;

use domain::{
    ConversationId, DomainError, LikeId, MessageId, Notification, NotificationId,
    NotificationKind, RepositoryError, UserId,
};
use serde_json::Value as JsonValue;

use crate::{
    clock::Clock,
    dto::{NotificationDto, NotificationStats},
    error::ApplicationError,
    realtime::{RealtimeDispatcher, RealtimeEvent},
    repository::{NotificationRepository, UserRepository},
};

pub struct NotificationServiceDependencies {
    pub notification_repository: Arc<dyn NotificationRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub dispatcher: Arc<dyn RealtimeDispatcher>,
    pub clock: Arc<dyn Clock>,
}

pub struct NotificationService {
    deps: NotificationServiceDependencies,
}

impl NotificationService {
    pub fn new(deps: NotificationServiceDependencies) -> Self {
        Self { deps }
    }

    /// 创建通知并发出 `notification:new` 事件。
    pub async fn create(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        data: JsonValue,
    ) -> Result<NotificationDto, ApplicationError> {
        self.ensure_user_exists(user_id).await?;
        let notification = Notification::new(
            NotificationId::from(Uuid::new_v4()),
            user_id,
            kind,
            title,
            message,
            data,
            self.deps.clock.now(),
        );
        self.persist_and_emit(notification).await
    }

    /// liked-you 场景的便捷入口。
    pub async fn notify_liked_you(
        &self,
        recipient: UserId,
        sender_name: &str,
        like_id: LikeId,
        sender_id: UserId,
    ) -> Result<NotificationDto, ApplicationError> {
        self.ensure_user_exists(recipient).await?;
        let notification = Notification::liked_you(
            NotificationId::from(Uuid::new_v4()),
            recipient,
            sender_name,
            like_id,
            sender_id,
            self.deps.clock.now(),
        );
        self.persist_and_emit(notification).await
    }

    /// mutual-match 场景的便捷入口（每名参与者各调用一次）。
    pub async fn notify_mutual_match(
        &self,
        recipient: UserId,
        matched_name: &str,
        matched_user_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<NotificationDto, ApplicationError> {
        self.ensure_user_exists(recipient).await?;
        let notification = Notification::mutual_match(
            NotificationId::from(Uuid::new_v4()),
            recipient,
            matched_name,
            matched_user_id,
            conversation_id,
            self.deps.clock.now(),
        );
        self.persist_and_emit(notification).await
    }

    /// message-received 场景的便捷入口；首条消息使用区分文案。
    #[allow(clippy::too_many_arguments)]
    pub async fn notify_message_received(
        &self,
        recipient: UserId,
        sender_name: &str,
        conversation_id: ConversationId,
        message_id: MessageId,
        sender_id: UserId,
        first_message: bool,
    ) -> Result<NotificationDto, ApplicationError> {
        self.ensure_user_exists(recipient).await?;
        let notification = Notification::message_received(
            NotificationId::from(Uuid::new_v4()),
            recipient,
            sender_name,
            conversation_id,
            message_id,
            sender_id,
            first_message,
            self.deps.clock.now(),
        );
        self.persist_and_emit(notification).await
    }

    /// 标记单条通知已读。重复标记是冲突，刻意暴露给调用方。
    pub async fn mark_read(
        &self,
        id: NotificationId,
        user_id: UserId,
    ) -> Result<NotificationDto, ApplicationError> {
        let notification = self
            .deps
            .notification_repository
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotificationNotFound)?;

        if notification.user_id != user_id {
            return Err(DomainError::NotAuthorized.into());
        }
        if notification.is_read {
            return Err(DomainError::NotificationAlreadyRead.into());
        }

        // 条件更新兜底：并发的重复标记只有一个成功
        let updated = match self.deps.notification_repository.mark_read(id).await {
            Ok(updated) => updated,
            Err(RepositoryError::Conflict) => {
                return Err(DomainError::NotificationAlreadyRead.into())
            }
            Err(RepositoryError::NotFound) => {
                return Err(DomainError::NotificationNotFound.into())
            }
            Err(err) => return Err(err.into()),
        };

        self.deps
            .dispatcher
            .emit(
                user_id,
                RealtimeEvent::NotificationRead {
                    notification_id: Some(id),
                    all_read: false,
                    count: 1,
                },
            )
            .await;

        Ok(NotificationDto::from(&updated))
    }

    /// 全部标记已读，返回条数（0 合法）。
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, ApplicationError> {
        let count = self
            .deps
            .notification_repository
            .mark_all_read(user_id)
            .await?;

        self.deps
            .dispatcher
            .emit(
                user_id,
                RealtimeEvent::NotificationRead {
                    notification_id: None,
                    all_read: true,
                    count,
                },
            )
            .await;

        Ok(count)
    }

    pub async fn list(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationDto>, ApplicationError> {
        let notifications = self
            .deps
            .notification_repository
            .list_for_user(user_id, unread_only, limit, offset)
            .await?;
        Ok(notifications.iter().map(NotificationDto::from).collect())
    }

    pub async fn unread_count(&self, user_id: UserId) -> Result<u64, ApplicationError> {
        Ok(self
            .deps
            .notification_repository
            .unread_count(user_id)
            .await?)
    }

    pub async fn stats(&self, user_id: UserId) -> Result<NotificationStats, ApplicationError> {
        Ok(self.deps.notification_repository.stats(user_id).await?)
    }

    async fn ensure_user_exists(&self, user_id: UserId) -> Result<(), ApplicationError> {
        self.deps
            .user_repository
            .find_profile(user_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;
        Ok(())
    }

    async fn persist_and_emit(
        &self,
        notification: Notification,
    ) -> Result<NotificationDto, ApplicationError> {
        let stored = self
            .deps
            .notification_repository
            .create(notification)
            .await?;

        tracing::info!(
            notification_id = %stored.id,
            user_id = %stored.user_id,
            kind = %stored.kind,
            "notification created"
        );

        self.deps
            .dispatcher
            .emit(
                stored.user_id,
                RealtimeEvent::NotificationNew {
                    notification: stored.clone(),
                },
            )
            .await;

        Ok(NotificationDto::from(&stored))
    }
}
