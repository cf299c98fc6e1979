//! 领域错误定义
//!
//! 每个失败的状态转换对应一个带稳定语义的错误变体，
//! 冲突类变体携带已存在的记录，便于调用方做幂等处理。

use thiserror::Error;

use crate::{conversation::Conversation, like::Like};

/// 领域错误类型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// 输入验证失败
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 不能给自己发送 like
    #[error("cannot send a like to yourself")]
    SelfLike,

    /// 目标用户不存在
    #[error("receiver not found")]
    ReceiverNotFound,

    /// 用户不存在
    #[error("user not found")]
    UserNotFound,

    /// 同方向的 like 已存在（携带现有记录）
    #[error("like already exists for this pair")]
    LikeAlreadyExists(Box<Like>),

    /// 对方已经从反方向拒绝过，不允许复活单边拒绝关系
    #[error("receiver has already rejected this pairing")]
    AlreadyRejectedByReceiver,

    /// Like 记录不存在
    #[error("like not found")]
    LikeNotFound,

    /// Like 已经被处理过（非 pending）
    #[error("like has already been processed")]
    LikeAlreadyProcessed,

    /// 会话参与者不能相同
    #[error("conversation participants must be different users")]
    InvalidParticipants,

    /// 该用户对已存在会话（携带现有记录，调用方视为幂等成功）
    #[error("conversation already exists for this pair")]
    ConversationExists(Box<Conversation>),

    /// 会话不存在
    #[error("conversation not found")]
    ConversationNotFound,

    /// 会话已经解除匹配
    #[error("conversation is already unmatched")]
    AlreadyUnmatched,

    /// 会话已解除匹配，拒绝新消息
    #[error("conversation has been unmatched")]
    ConversationUnmatched,

    /// 通知不存在
    #[error("notification not found")]
    NotificationNotFound,

    /// 通知已读（重复标记视为调用方错误）
    #[error("notification is already read")]
    NotificationAlreadyRead,

    /// 操作者无权操作该资源
    #[error("not authorized to act on this resource")]
    NotAuthorized,
}

impl DomainError {
    /// 创建验证错误
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 领域结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 存储层错误，由仓库实现负责把驱动错误翻译到这三类。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    /// 记录不存在
    #[error("record not found")]
    NotFound,

    /// 唯一约束或条件更新冲突
    #[error("storage conflict")]
    Conflict,

    /// 其他存储错误
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
