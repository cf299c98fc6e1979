use std::sync::Arc;

use application::services::{ConversationService, LikeService, MessageService, NotificationService};
use infrastructure::ConnectionRegistry;

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub like_service: Arc<LikeService>,
    pub conversation_service: Arc<ConversationService>,
    pub message_service: Arc<MessageService>,
    pub notification_service: Arc<NotificationService>,
    pub registry: Arc<ConnectionRegistry>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        like_service: Arc<LikeService>,
        conversation_service: Arc<ConversationService>,
        message_service: Arc<MessageService>,
        notification_service: Arc<NotificationService>,
        registry: Arc<ConnectionRegistry>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            like_service,
            conversation_service,
            message_service,
            notification_service,
            registry,
            jwt_service,
        }
    }
}
