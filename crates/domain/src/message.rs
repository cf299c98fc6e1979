//! 消息实体
//!
//! 消息属于且仅属于一个会话，创建后除 is_read 外不可变。

use serde::{Deserialize, Serialize};

use crate::value_objects::{ConversationId, MessageContent, MessageId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: MessageContent,
    pub is_read: bool,
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(
        id: MessageId,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: MessageContent,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            conversation_id,
            sender_id,
            content,
            is_read: false,
            created_at: now,
        }
    }

    /// 已读翻转是消息唯一允许的变更。
    pub fn mark_read(&mut self) {
        self.is_read = true;
    }
}
