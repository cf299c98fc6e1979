//! 通知实体定义
//!
//! 通知是追加写入的用户事件记录，除已读标记外不可变。
//! 三种类型的 data 负载形状是客户端消费的稳定契约，
//! 因此固定在便捷构造函数里。

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::errors::DomainError;
use crate::value_objects::{
    ConversationId, LikeId, MessageId, NotificationId, Timestamp, UserId,
};

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    UserLikedYou,
    MessageReceived,
    MutualMatch,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::UserLikedYou => "user_liked_you",
            NotificationKind::MessageReceived => "message_received",
            NotificationKind::MutualMatch => "mutual_match",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 通知实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// 指向触发实体的结构化负载
    pub data: JsonValue,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl Notification {
    pub fn new(
        id: NotificationId,
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        data: JsonValue,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            data,
            is_read: false,
            created_at: now,
        }
    }

    /// 收到 like 的通知
    pub fn liked_you(
        id: NotificationId,
        recipient: UserId,
        sender_name: &str,
        like_id: LikeId,
        sender_id: UserId,
        now: Timestamp,
    ) -> Self {
        Self::new(
            id,
            recipient,
            NotificationKind::UserLikedYou,
            "New like",
            format!("{} liked your profile", sender_name),
            json!({
                "like_id": like_id,
                "sender_id": sender_id,
            }),
            now,
        )
    }

    /// 双向匹配成功的通知，双方各一条。
    pub fn mutual_match(
        id: NotificationId,
        recipient: UserId,
        matched_name: &str,
        matched_user_id: UserId,
        conversation_id: ConversationId,
        now: Timestamp,
    ) -> Self {
        Self::new(
            id,
            recipient,
            NotificationKind::MutualMatch,
            "It's a match!",
            format!("You and {} liked each other", matched_name),
            json!({
                "matched_user_id": matched_user_id,
                "conversation_id": conversation_id,
            }),
            now,
        )
    }

    /// 收到消息的通知；first_message 只影响文案，不是独立类型。
    pub fn message_received(
        id: NotificationId,
        recipient: UserId,
        sender_name: &str,
        conversation_id: ConversationId,
        message_id: MessageId,
        sender_id: UserId,
        first_message: bool,
        now: Timestamp,
    ) -> Self {
        let (title, message) = if first_message {
            (
                "First message",
                format!("{} sent you the first message", sender_name),
            )
        } else {
            ("New message", format!("{} sent you a message", sender_name))
        };
        Self::new(
            id,
            recipient,
            NotificationKind::MessageReceived,
            title,
            message,
            json!({
                "conversation_id": conversation_id,
                "message_id": message_id,
                "sender_id": sender_id,
                "first_message": first_message,
            }),
            now,
        )
    }

    /// 标记已读；重复标记是冲突，刻意不做静默幂等。
    pub fn mark_read(&mut self) -> Result<(), DomainError> {
        if self.is_read {
            return Err(DomainError::NotificationAlreadyRead);
        }
        self.is_read = true;
        Ok(())
    }
}
