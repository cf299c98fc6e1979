//! 对外数据传输对象

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use domain::{
    Conversation, ConversationId, ConversationStatus, Like, LikeId, LikeStatus, Message,
    MessageId, Notification, NotificationId, NotificationKind, Timestamp, UserId, UserProfile,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeDto {
    pub id: LikeId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub status: LikeStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Like> for LikeDto {
    fn from(like: &Like) -> Self {
        Self {
            id: like.id,
            sender_id: like.sender_id,
            receiver_id: like.receiver_id,
            status: like.status,
            created_at: like.created_at,
            updated_at: like.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    pub is_read: bool,
    pub created_at: Timestamp,
    /// 发送者资料摘要（历史查询中按需填充）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserProfile>,
}

impl MessageDto {
    pub fn from_message(message: &Message, sender: Option<UserProfile>) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: message.content.as_str().to_owned(),
            is_read: message.is_read,
            created_at: message.created_at,
            sender,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDto {
    pub id: ConversationId,
    pub status: ConversationStatus,
    pub origin_like_id: LikeId,
    /// 两名参与者的公开资料摘要
    pub participants: Vec<UserProfile>,
    pub last_message_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl ConversationDto {
    pub fn from_conversation(
        conversation: &Conversation,
        participants: Vec<UserProfile>,
    ) -> Self {
        Self {
            id: conversation.id,
            status: conversation.status,
            origin_like_id: conversation.origin_like_id,
            participants,
            last_message_at: conversation.last_message_at,
            created_at: conversation.created_at,
        }
    }
}

/// 收件箱条目：会话 + 最近一条消息 + 调用者的未读数。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummaryDto {
    #[serde(flatten)]
    pub conversation: ConversationDto,
    pub last_message: Option<MessageDto>,
    pub unread_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDto {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: JsonValue,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl From<&Notification> for NotificationDto {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            user_id: notification.user_id,
            kind: notification.kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
            data: notification.data.clone(),
            is_read: notification.is_read,
            created_at: notification.created_at,
        }
    }
}

/// 通知统计：总量/未读/已读 + 按类型拆分。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total: u64,
    pub unread: u64,
    pub read: u64,
    pub user_liked_you: u64,
    pub message_received: u64,
    pub mutual_match: u64,
}
