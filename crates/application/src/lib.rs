//! 应用层：匹配生命周期与实时通知的用例编排
//!
//! 领域实体的持久化通过仓库 trait 注入，实时分发通过
//! `RealtimeDispatcher` 注入；所有实时副作用都是尽力而为，
//! 永远不会让触发它的持久化操作失败。

pub mod clock;
pub mod dto;
pub mod error;
pub mod realtime;
pub mod repository;
pub mod services;

pub use clock::{Clock, SystemClock};
pub use dto::{
    ConversationDto, ConversationSummaryDto, LikeDto, MessageDto, NotificationDto,
    NotificationStats,
};
pub use error::ApplicationError;
pub use realtime::{RealtimeDispatcher, RealtimeEvent};
pub use repository::{
    ConversationRepository, LikeRepository, MessageRepository, NotificationRepository,
    UserRepository,
};
