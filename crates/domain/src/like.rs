//! Like 实体与状态机
//!
//! 有向边 (sender, receiver)，每个有序对最多一条记录。
//! 状态机：pending → {accepted, rejected}，{pending, accepted} → unmatched。
//! rejected 是终态，永远不会被 unmatch。

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{LikeId, Timestamp, UserId};

/// Like 生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "like_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LikeStatus {
    Pending,
    Accepted,
    Rejected,
    Unmatched,
}

impl LikeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeStatus::Pending => "pending",
            LikeStatus::Accepted => "accepted",
            LikeStatus::Rejected => "rejected",
            LikeStatus::Unmatched => "unmatched",
        }
    }
}

impl std::fmt::Display for LikeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub id: LikeId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub status: LikeStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Like {
    /// 创建新的 like，默认 pending；静默拒绝路径直接以 rejected 创建。
    pub fn new(
        id: LikeId,
        sender_id: UserId,
        receiver_id: UserId,
        status: LikeStatus,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if sender_id == receiver_id {
            return Err(DomainError::SelfLike);
        }
        Ok(Self {
            id,
            sender_id,
            receiver_id,
            status,
            created_at: now,
            updated_at: now,
        })
    }

    /// 只有 receiver 可以接受，且仅限 pending 状态。
    pub fn accept(&mut self, actor: UserId, at: Timestamp) -> Result<(), DomainError> {
        self.transition_from_pending(actor, LikeStatus::Accepted, at)
    }

    /// 只有 receiver 可以拒绝，且仅限 pending 状态。
    pub fn reject(&mut self, actor: UserId, at: Timestamp) -> Result<(), DomainError> {
        self.transition_from_pending(actor, LikeStatus::Rejected, at)
    }

    fn transition_from_pending(
        &mut self,
        actor: UserId,
        target: LikeStatus,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        if actor != self.receiver_id {
            return Err(DomainError::NotAuthorized);
        }
        if self.status != LikeStatus::Pending {
            return Err(DomainError::LikeAlreadyProcessed);
        }
        self.status = target;
        self.updated_at = at;
        Ok(())
    }

    /// unmatch 路径：pending 或 accepted 可以转入终态 unmatched。
    pub fn unmatch(&mut self, at: Timestamp) -> Result<(), DomainError> {
        match self.status {
            LikeStatus::Pending | LikeStatus::Accepted => {
                self.status = LikeStatus::Unmatched;
                self.updated_at = at;
                Ok(())
            }
            LikeStatus::Rejected | LikeStatus::Unmatched => {
                Err(DomainError::LikeAlreadyProcessed)
            }
        }
    }
}
