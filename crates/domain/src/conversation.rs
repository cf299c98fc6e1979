//! Conversation 实体与规范化参与者排序
//!
//! 每个无序用户对最多一条会话记录，存储身份由
//! (participant_low_id, participant_high_id) 的全序决定，
//! 与谁先发起 like 无关。

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ConversationId, LikeId, Timestamp, UserId};

/// 把一对用户规范化为 (low, high)，按 Uuid 升序。
/// 两个参与者相同是非法输入。
pub fn canonical_pair(a: UserId, b: UserId) -> Result<(UserId, UserId), DomainError> {
    if a == b {
        return Err(DomainError::InvalidParticipants);
    }
    if a < b {
        Ok((a, b))
    } else {
        Ok((b, a))
    }
}

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "conversation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Unmatched,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Active => "active",
            ConversationStatus::Unmatched => "unmatched",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub participant_low_id: UserId,
    pub participant_high_id: UserId,
    pub status: ConversationStatus,
    /// 产生此会话的 Like 记录
    pub origin_like_id: LikeId,
    /// 最近一条已提交消息的时间，用于收件箱排序；无消息时为空
    pub last_message_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Conversation {
    pub fn new(
        id: ConversationId,
        user_a: UserId,
        user_b: UserId,
        origin_like_id: LikeId,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let (low, high) = canonical_pair(user_a, user_b)?;
        Ok(Self {
            id,
            participant_low_id: low,
            participant_high_id: high,
            status: ConversationStatus::Active,
            origin_like_id,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.participant_low_id == user_id || self.participant_high_id == user_id
    }

    /// 返回相对于 viewer 的另一名参与者。
    pub fn other_participant(&self, viewer: UserId) -> Option<UserId> {
        if viewer == self.participant_low_id {
            Some(self.participant_high_id)
        } else if viewer == self.participant_high_id {
            Some(self.participant_low_id)
        } else {
            None
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ConversationStatus::Active
    }

    /// 解除匹配；已解除的会话再次解除是冲突。
    pub fn unmatch(&mut self, actor: UserId, at: Timestamp) -> Result<(), DomainError> {
        if !self.has_participant(actor) {
            return Err(DomainError::NotAuthorized);
        }
        if self.status == ConversationStatus::Unmatched {
            return Err(DomainError::AlreadyUnmatched);
        }
        self.status = ConversationStatus::Unmatched;
        self.updated_at = at;
        Ok(())
    }
}
