//! 约会应用匹配核心领域模型
//!
//! 包含 Like、Conversation、Message、Notification 等核心实体，
//! 以及它们的状态机转换规则。

pub mod conversation;
pub mod errors;
pub mod like;
pub mod message;
pub mod notification;
pub mod user;
pub mod value_objects;

pub use conversation::{canonical_pair, Conversation, ConversationStatus};
pub use errors::{DomainError, DomainResult, RepositoryError};
pub use like::{Like, LikeStatus};
pub use message::Message;
pub use notification::{Notification, NotificationKind};
pub use user::UserProfile;
pub use value_objects::{
    ConversationId, LikeId, MessageContent, MessageId, NotificationId, Timestamp, UserId,
};
