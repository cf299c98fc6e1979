pub mod conversation_service;
pub mod like_service;
pub mod message_service;
pub mod notification_service;

pub use conversation_service::{ConversationService, ConversationServiceDependencies};
pub use like_service::{
    LikeDecision, LikeService, LikeServiceDependencies, SendLikeRequest, UpdateLikeStatusRequest,
};
pub use message_service::{MessageService, MessageServiceDependencies, SendMessageRequest};
pub use notification_service::{NotificationService, NotificationServiceDependencies};

#[cfg(test)]
pub mod test_support;

#[cfg(test)]
mod like_service_tests;
