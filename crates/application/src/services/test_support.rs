//! 服务层测试支撑：内存仓库 + 录制型分发器。
//!
//! 内存实现遵守与 Postgres 实现相同的契约：唯一约束冲突返回
//! Conflict，条件更新失败区分 NotFound 和 Conflict，unmatch 和
//! 消息写入的联动在同一把锁内完成。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use domain::{
    Conversation, ConversationId, ConversationStatus, Like, LikeId, LikeStatus, Message,
    MessageId, Notification, NotificationId, NotificationKind, RepositoryError, Timestamp,
    UserId, UserProfile,
};

use crate::{
    clock::SystemClock,
    dto::NotificationStats,
    realtime::{RealtimeDispatcher, RealtimeEvent},
    repository::{
        ConversationRepository, LikeRepository, MessageRepository, NotificationRepository,
        UserRepository,
    },
    services::{
        ConversationService, ConversationServiceDependencies, LikeService,
        LikeServiceDependencies, MessageService, MessageServiceDependencies,
        NotificationService, NotificationServiceDependencies,
    },
};

#[derive(Default)]
struct InMemoryState {
    profiles: HashMap<UserId, UserProfile>,
    likes: Vec<Like>,
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    notifications: Vec<Notification>,
}

/// 全部表共用一把锁，跨表联动（unmatch、消息写入）天然原子。
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, display_name: &str) -> UserId {
        let id = UserId::from(Uuid::new_v4());
        self.state.lock().unwrap().profiles.insert(
            id,
            UserProfile {
                id,
                display_name: display_name.to_owned(),
                avatar_url: None,
            },
        );
        id
    }

    pub fn like(&self, id: LikeId) -> Option<Like> {
        self.state
            .lock()
            .unwrap()
            .likes
            .iter()
            .find(|l| l.id == id)
            .cloned()
    }

    pub fn conversation(&self, id: ConversationId) -> Option<Conversation> {
        self.state
            .lock()
            .unwrap()
            .conversations
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn conversation_for_pair(&self, a: UserId, b: UserId) -> Option<Conversation> {
        self.state
            .lock()
            .unwrap()
            .conversations
            .iter()
            .find(|c| c.has_participant(a) && c.has_participant(b))
            .cloned()
    }

    pub fn notifications_for(&self, user_id: UserId) -> Vec<Notification> {
        self.state
            .lock()
            .unwrap()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn seed_like(&self, like: Like) {
        self.state.lock().unwrap().likes.push(like);
    }

    pub fn seed_conversation(&self, conversation: Conversation) {
        self.state.lock().unwrap().conversations.push(conversation);
    }

    pub fn seed_notification(&self, notification: Notification) {
        self.state.lock().unwrap().notifications.push(notification);
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_profile(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.state.lock().unwrap().profiles.get(&id).cloned())
    }
}

#[async_trait]
impl LikeRepository for InMemoryStore {
    async fn create(&self, like: Like) -> Result<Like, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if state
            .likes
            .iter()
            .any(|l| l.sender_id == like.sender_id && l.receiver_id == like.receiver_id)
        {
            return Err(RepositoryError::Conflict);
        }
        state.likes.push(like.clone());
        Ok(like)
    }

    async fn find_by_id(&self, id: LikeId) -> Result<Option<Like>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .likes
            .iter()
            .find(|l| l.id == id)
            .cloned())
    }

    async fn find_pair(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> Result<Option<Like>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .likes
            .iter()
            .find(|l| l.sender_id == sender_id && l.receiver_id == receiver_id)
            .cloned())
    }

    async fn update_status_if_pending(
        &self,
        id: LikeId,
        new_status: LikeStatus,
        updated_at: Timestamp,
    ) -> Result<Like, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let like = state
            .likes
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if like.status != LikeStatus::Pending {
            return Err(RepositoryError::Conflict);
        }
        like.status = new_status;
        like.updated_at = updated_at;
        Ok(like.clone())
    }

    async fn list_received(
        &self,
        receiver_id: UserId,
        status: LikeStatus,
    ) -> Result<Vec<Like>, RepositoryError> {
        let mut likes: Vec<Like> = self
            .state
            .lock()
            .unwrap()
            .likes
            .iter()
            .filter(|l| l.receiver_id == receiver_id && l.status == status)
            .cloned()
            .collect();
        likes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(likes)
    }

    async fn list_sent(&self, sender_id: UserId) -> Result<Vec<Like>, RepositoryError> {
        let mut likes: Vec<Like> = self
            .state
            .lock()
            .unwrap()
            .likes
            .iter()
            .filter(|l| l.sender_id == sender_id)
            .cloned()
            .collect();
        likes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(likes)
    }

    async fn count_received(
        &self,
        receiver_id: UserId,
        status: LikeStatus,
    ) -> Result<u64, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .likes
            .iter()
            .filter(|l| l.receiver_id == receiver_id && l.status == status)
            .count() as u64)
    }
}

#[async_trait]
impl ConversationRepository for InMemoryStore {
    async fn create(&self, conversation: Conversation) -> Result<Conversation, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if state.conversations.iter().any(|c| {
            c.participant_low_id == conversation.participant_low_id
                && c.participant_high_id == conversation.participant_high_id
        }) {
            return Err(RepositoryError::Conflict);
        }
        state.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn find_by_id(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .conversations
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn find_by_pair(
        &self,
        low: UserId,
        high: UserId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .conversations
            .iter()
            .find(|c| c.participant_low_id == low && c.participant_high_id == high)
            .cloned())
    }

    async fn unmatch(
        &self,
        id: ConversationId,
        updated_at: Timestamp,
    ) -> Result<Conversation, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let conversation = state
            .conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if conversation.status != ConversationStatus::Active {
            return Err(RepositoryError::Conflict);
        }
        conversation.status = ConversationStatus::Unmatched;
        conversation.updated_at = updated_at;
        let updated = conversation.clone();

        // origin like 联动转换在同一"事务"内
        let origin_like_id = updated.origin_like_id;
        if let Some(like) = state.likes.iter_mut().find(|l| l.id == origin_like_id) {
            if matches!(like.status, LikeStatus::Pending | LikeStatus::Accepted) {
                like.status = LikeStatus::Unmatched;
                like.updated_at = updated_at;
            }
        }
        Ok(updated)
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let mut conversations: Vec<Conversation> = self
            .state
            .lock()
            .unwrap()
            .conversations
            .iter()
            .filter(|c| c.has_participant(user_id))
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        // last_message_at 倒序，空值排最后
        conversations.sort_by(|a, b| match (b.last_message_at, a.last_message_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => b.created_at.cmp(&a.created_at),
        });
        Ok(conversations)
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn create_in_conversation(
        &self,
        message: Message,
    ) -> Result<(Message, bool), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let status = state
            .conversations
            .iter()
            .find(|c| c.id == message.conversation_id)
            .map(|c| c.status)
            .ok_or(RepositoryError::NotFound)?;
        if status != ConversationStatus::Active {
            return Err(RepositoryError::Conflict);
        }
        let was_first = !state
            .messages
            .iter()
            .any(|m| m.conversation_id == message.conversation_id);
        state.messages.push(message.clone());
        if let Some(conversation) = state
            .conversations
            .iter_mut()
            .find(|c| c.id == message.conversation_id)
        {
            conversation.last_message_at = Some(message.created_at);
            conversation.updated_at = message.created_at;
        }
        Ok((message, was_first))
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn list_for_conversation(
        &self,
        conversation_id: ConversationId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut messages: Vec<Message> = self
            .state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn last_message(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .max_by_key(|m| m.created_at)
            .cloned())
    }

    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        viewer_id: UserId,
    ) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let mut count = 0;
        for message in state
            .messages
            .iter_mut()
            .filter(|m| m.conversation_id == conversation_id)
            .filter(|m| m.sender_id != viewer_id && !m.is_read)
        {
            message.mark_read();
            count += 1;
        }
        Ok(count)
    }

    async fn unread_count(
        &self,
        conversation_id: ConversationId,
        viewer_id: UserId,
    ) -> Result<u64, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .filter(|m| m.sender_id != viewer_id && !m.is_read)
            .count() as u64)
    }

    async fn total_unread_count(&self, viewer_id: UserId) -> Result<u64, RepositoryError> {
        let state = self.state.lock().unwrap();
        let active: Vec<ConversationId> = state
            .conversations
            .iter()
            .filter(|c| c.has_participant(viewer_id) && c.status == ConversationStatus::Active)
            .map(|c| c.id)
            .collect();
        Ok(state
            .messages
            .iter()
            .filter(|m| active.contains(&m.conversation_id))
            .filter(|m| m.sender_id != viewer_id && !m.is_read)
            .count() as u64)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn create(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        self.state
            .lock()
            .unwrap()
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    async fn find_by_id(
        &self,
        id: NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .notifications
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    async fn mark_read(&self, id: NotificationId) -> Result<Notification, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if notification.is_read {
            return Err(RepositoryError::Conflict);
        }
        notification.is_read = true;
        Ok(notification.clone())
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let mut count = 0;
        for notification in state
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            notification.is_read = true;
            count += 1;
        }
        Ok(count)
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let mut notifications: Vec<Notification> = self
            .state
            .lock()
            .unwrap()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .filter(|n| !unread_only || !n.is_read)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn unread_count(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn stats(&self, user_id: UserId) -> Result<NotificationStats, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut stats = NotificationStats::default();
        for notification in state.notifications.iter().filter(|n| n.user_id == user_id) {
            stats.total += 1;
            if notification.is_read {
                stats.read += 1;
            } else {
                stats.unread += 1;
            }
            match notification.kind {
                NotificationKind::UserLikedYou => stats.user_liked_you += 1,
                NotificationKind::MessageReceived => stats.message_received += 1,
                NotificationKind::MutualMatch => stats.mutual_match += 1,
            }
        }
        Ok(stats)
    }
}

/// 按用户记录发出的全部事件，供断言。
#[derive(Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<(UserId, RealtimeEvent)>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(UserId, RealtimeEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, user_id: UserId) -> Vec<RealtimeEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn event_names_for(&self, user_id: UserId) -> Vec<&'static str> {
        self.events_for(user_id)
            .iter()
            .map(RealtimeEvent::name)
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl RealtimeDispatcher for RecordingDispatcher {
    async fn emit(&self, user_id: UserId, event: RealtimeEvent) {
        self.events.lock().unwrap().push((user_id, event));
    }
}

/// 完整装配好的服务图，每个测试一份。
pub struct TestContext {
    pub store: InMemoryStore,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub like_service: LikeService,
    pub conversation_service: Arc<ConversationService>,
    pub message_service: MessageService,
    pub notification_service: Arc<NotificationService>,
}

/// 断言应用错误是领域错误并取出。
pub fn unwrap_domain(err: crate::error::ApplicationError) -> domain::DomainError {
    match err {
        crate::error::ApplicationError::Domain(err) => err,
        other => panic!("expected domain error, got {other}"),
    }
}

/// 走完整 like 流程建立一对匹配（Alice → Bob，Bob 接受），
/// 返回 (alice, bob, conversation_id)，事件记录已清空。
pub async fn establish_match(ctx: &TestContext) -> (UserId, UserId, ConversationId) {
    let alice = ctx.store.add_user("Alice");
    let bob = ctx.store.add_user("Bob");

    let like = ctx
        .like_service
        .send_like(
            alice,
            crate::services::SendLikeRequest { receiver_id: bob },
        )
        .await
        .unwrap();
    ctx.like_service
        .update_like_status(
            like.id,
            bob,
            crate::services::UpdateLikeStatusRequest {
                status: crate::services::LikeDecision::Accepted,
            },
        )
        .await
        .unwrap();

    let conversation = ctx
        .store
        .conversation_for_pair(alice, bob)
        .expect("conversation should exist after mutual match");
    ctx.dispatcher.clear();
    (alice, bob, conversation.id)
}

pub fn context() -> TestContext {
    let store = InMemoryStore::new();
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let clock = Arc::new(SystemClock);

    let notification_service = Arc::new(NotificationService::new(NotificationServiceDependencies {
        notification_repository: Arc::new(store.clone()),
        user_repository: Arc::new(store.clone()),
        dispatcher: dispatcher.clone(),
        clock: clock.clone(),
    }));

    let conversation_service = Arc::new(ConversationService::new(ConversationServiceDependencies {
        conversation_repository: Arc::new(store.clone()),
        message_repository: Arc::new(store.clone()),
        user_repository: Arc::new(store.clone()),
        dispatcher: dispatcher.clone(),
        clock: clock.clone(),
    }));

    let like_service = LikeService::new(LikeServiceDependencies {
        like_repository: Arc::new(store.clone()),
        user_repository: Arc::new(store.clone()),
        conversation_service: conversation_service.clone(),
        notification_service: notification_service.clone(),
        dispatcher: dispatcher.clone(),
        clock: clock.clone(),
    });

    let message_service = MessageService::new(MessageServiceDependencies {
        message_repository: Arc::new(store.clone()),
        conversation_repository: Arc::new(store.clone()),
        user_repository: Arc::new(store.clone()),
        notification_service: notification_service.clone(),
        dispatcher: dispatcher.clone(),
        clock,
    });

    TestContext {
        store,
        dispatcher,
        like_service,
        conversation_service,
        message_service,
        notification_service,
    }
}
