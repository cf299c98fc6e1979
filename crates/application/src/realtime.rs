//! 实时事件分类与分发接口
//!
//! 事件名是客户端消费的线缆契约；serde 标签即事件名。
//! 分发是尽力而为：没有在线连接就丢弃，传输失败由实现内部记录，
//! 接口本身不返回错误。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use domain::{
    ConversationId, LikeId, LikeStatus, Message, Notification, NotificationId, Timestamp, UserId,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum RealtimeEvent {
    /// 收到一条（非静默拒绝的）like
    #[serde(rename = "like:received")]
    LikeReceived {
        like_id: LikeId,
        sender_id: UserId,
        status: LikeStatus,
        created_at: Timestamp,
    },
    /// like 状态被 receiver 处理
    #[serde(rename = "like:status_updated")]
    LikeStatusUpdated {
        like_id: LikeId,
        receiver_id: UserId,
        status: LikeStatus,
    },
    /// 静默拒绝时，反向 pending like 的发送者收到的事件
    #[serde(rename = "like:rejected")]
    LikeRejected {
        rejected_by: UserId,
        like_id: LikeId,
    },
    /// 任何通知创建
    #[serde(rename = "notification:new")]
    NotificationNew { notification: Notification },
    /// 单条或全部通知被标记已读
    #[serde(rename = "notification:read")]
    NotificationRead {
        notification_id: Option<NotificationId>,
        all_read: bool,
        count: u64,
    },
    /// 新消息落库
    #[serde(rename = "new_message")]
    NewMessage {
        conversation_id: ConversationId,
        message: Message,
    },
    /// 对方把会话标记为已读
    #[serde(rename = "messages_read")]
    MessagesRead {
        conversation_id: ConversationId,
        reader_id: UserId,
    },
    /// 会话被解除匹配
    #[serde(rename = "conversation_unmatched")]
    ConversationUnmatched {
        conversation_id: ConversationId,
        unmatched_by: UserId,
    },
    /// 客户端发起、服务器中继的输入状态
    #[serde(rename = "typing:start")]
    TypingStart {
        conversation_id: ConversationId,
        typer_id: UserId,
    },
    #[serde(rename = "typing:stop")]
    TypingStop {
        conversation_id: ConversationId,
        typer_id: UserId,
    },
}

impl RealtimeEvent {
    /// 线缆上的事件名，用于日志。
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::LikeReceived { .. } => "like:received",
            RealtimeEvent::LikeStatusUpdated { .. } => "like:status_updated",
            RealtimeEvent::LikeRejected { .. } => "like:rejected",
            RealtimeEvent::NotificationNew { .. } => "notification:new",
            RealtimeEvent::NotificationRead { .. } => "notification:read",
            RealtimeEvent::NewMessage { .. } => "new_message",
            RealtimeEvent::MessagesRead { .. } => "messages_read",
            RealtimeEvent::ConversationUnmatched { .. } => "conversation_unmatched",
            RealtimeEvent::TypingStart { .. } => "typing:start",
            RealtimeEvent::TypingStop { .. } => "typing:stop",
        }
    }
}

/// 按用户寻址的实时分发接口。
///
/// 实现维护 user_id 到零或多条活跃连接的映射；一个用户的所有
/// 会话都会收到同一事件。`emit` 在签名上就不可失败——REST 读取
/// 才是客户端错过状态的对账来源。
#[async_trait]
pub trait RealtimeDispatcher: Send + Sync {
    async fn emit(&self, user_id: UserId, event: RealtimeEvent);
}
