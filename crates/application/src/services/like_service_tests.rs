use domain::{DomainError, LikeStatus, NotificationKind};

use crate::realtime::RealtimeEvent;
use crate::services::test_support::{context, establish_match, unwrap_domain};
use crate::services::{LikeDecision, SendLikeRequest, UpdateLikeStatusRequest};

#[tokio::test]
async fn send_like_stores_pending_and_notifies_receiver() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");
    let bob = ctx.store.add_user("Bob");

    let like = ctx
        .like_service
        .send_like(alice, SendLikeRequest { receiver_id: bob })
        .await
        .unwrap();

    assert_eq!(like.status, LikeStatus::Pending);
    assert_eq!(like.sender_id, alice);
    assert_eq!(like.receiver_id, bob);

    let notifications = ctx.store.notifications_for(bob);
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::UserLikedYou);
    assert!(notifications[0].message.contains("Alice"));

    // 通知先落库（notification:new），随后是 like:received
    assert_eq!(
        ctx.dispatcher.event_names_for(bob),
        vec!["notification:new", "like:received"]
    );
    assert!(ctx.dispatcher.events_for(alice).is_empty());
}

#[tokio::test]
async fn send_like_to_unknown_receiver_fails() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");
    let ghost = domain::UserId::from(uuid::Uuid::new_v4());

    let err = ctx
        .like_service
        .send_like(alice, SendLikeRequest { receiver_id: ghost })
        .await
        .unwrap_err();
    assert_eq!(unwrap_domain(err), DomainError::ReceiverNotFound);
}

#[tokio::test]
async fn self_like_is_rejected() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");

    let err = ctx
        .like_service
        .send_like(alice, SendLikeRequest { receiver_id: alice })
        .await
        .unwrap_err();
    assert_eq!(unwrap_domain(err), DomainError::SelfLike);
}

#[tokio::test]
async fn duplicate_like_returns_existing_record() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");
    let bob = ctx.store.add_user("Bob");

    let first = ctx
        .like_service
        .send_like(alice, SendLikeRequest { receiver_id: bob })
        .await
        .unwrap();
    let err = ctx
        .like_service
        .send_like(alice, SendLikeRequest { receiver_id: bob })
        .await
        .unwrap_err();

    match unwrap_domain(err) {
        DomainError::LikeAlreadyExists(existing) => assert_eq!(existing.id, first.id),
        other => panic!("expected LikeAlreadyExists, got {other:?}"),
    }
    // 重复发送不产生第二条通知
    assert_eq!(ctx.store.notifications_for(bob).len(), 1);
}

#[tokio::test]
async fn liking_back_someone_who_rejected_you_is_blocked() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");
    let bob = ctx.store.add_user("Bob");

    // Bob 已静默拒绝过 Alice
    ctx.like_service.pass_silently(bob, alice).await.unwrap();

    let err = ctx
        .like_service
        .send_like(alice, SendLikeRequest { receiver_id: bob })
        .await
        .unwrap_err();
    assert_eq!(unwrap_domain(err), DomainError::AlreadyRejectedByReceiver);
}

#[tokio::test]
async fn accepting_creates_conversation_and_notifies_both() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");
    let bob = ctx.store.add_user("Bob");

    let like = ctx
        .like_service
        .send_like(alice, SendLikeRequest { receiver_id: bob })
        .await
        .unwrap();
    ctx.dispatcher.clear();

    let updated = ctx
        .like_service
        .update_like_status(
            like.id,
            bob,
            UpdateLikeStatusRequest {
                status: LikeDecision::Accepted,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, LikeStatus::Accepted);

    let conversation = ctx
        .store
        .conversation_for_pair(alice, bob)
        .expect("mutual match should create a conversation");
    assert!(conversation.is_active());
    assert_eq!(conversation.origin_like_id, like.id);

    // 双方各一条 mutual-match 通知，各自的文案指向对方
    let alice_notifications = ctx.store.notifications_for(alice);
    assert_eq!(alice_notifications.len(), 1);
    assert_eq!(alice_notifications[0].kind, NotificationKind::MutualMatch);
    assert!(alice_notifications[0].message.contains("Bob"));

    let bob_match: Vec<_> = ctx
        .store
        .notifications_for(bob)
        .into_iter()
        .filter(|n| n.kind == NotificationKind::MutualMatch)
        .collect();
    assert_eq!(bob_match.len(), 1);
    assert!(bob_match[0].message.contains("Alice"));

    // sender 先收到状态更新，再收到匹配通知
    let alice_events = ctx.dispatcher.event_names_for(alice);
    assert_eq!(alice_events[0], "like:status_updated");
    assert!(alice_events.contains(&"notification:new"));
}

#[tokio::test]
async fn rejecting_does_not_create_conversation() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");
    let bob = ctx.store.add_user("Bob");

    let like = ctx
        .like_service
        .send_like(alice, SendLikeRequest { receiver_id: bob })
        .await
        .unwrap();
    let updated = ctx
        .like_service
        .update_like_status(
            like.id,
            bob,
            UpdateLikeStatusRequest {
                status: LikeDecision::Rejected,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, LikeStatus::Rejected);
    assert!(ctx.store.conversation_for_pair(alice, bob).is_none());
    // 拒绝不给 sender 发通知，只有实时状态事件
    assert!(ctx.store.notifications_for(alice).is_empty());
}

#[tokio::test]
async fn pass_silently_leaves_no_trace_for_target() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");
    let bob = ctx.store.add_user("Bob");

    let like = ctx.like_service.pass_silently(alice, bob).await.unwrap();

    assert_eq!(like.status, LikeStatus::Rejected);
    assert!(ctx.store.notifications_for(bob).is_empty());
    assert!(ctx.dispatcher.events_for(bob).is_empty());
}

#[tokio::test]
async fn pass_silently_signals_pending_reverse_sender() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");
    let bob = ctx.store.add_user("Bob");

    // Alice 先发出 pending like，Bob 随后静默拒绝
    let pending = ctx
        .like_service
        .send_like(alice, SendLikeRequest { receiver_id: bob })
        .await
        .unwrap();
    ctx.dispatcher.clear();

    ctx.like_service.pass_silently(bob, alice).await.unwrap();

    let alice_events = ctx.dispatcher.events_for(alice);
    assert_eq!(alice_events.len(), 1);
    assert_eq!(
        alice_events[0],
        RealtimeEvent::LikeRejected {
            rejected_by: bob,
            like_id: pending.id,
        }
    );
    // Alice 那条 pending like 保持原状
    assert_eq!(
        ctx.store.like(pending.id).unwrap().status,
        LikeStatus::Pending
    );
    // 静默拒绝不产生持久化通知
    assert!(ctx.store.notifications_for(alice).is_empty());
}

#[tokio::test]
async fn only_receiver_can_process_a_like() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");
    let bob = ctx.store.add_user("Bob");

    let like = ctx
        .like_service
        .send_like(alice, SendLikeRequest { receiver_id: bob })
        .await
        .unwrap();

    let err = ctx
        .like_service
        .update_like_status(
            like.id,
            alice,
            UpdateLikeStatusRequest {
                status: LikeDecision::Accepted,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(unwrap_domain(err), DomainError::NotAuthorized);
}

#[tokio::test]
async fn processing_a_like_twice_is_a_conflict() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");
    let bob = ctx.store.add_user("Bob");

    let like = ctx
        .like_service
        .send_like(alice, SendLikeRequest { receiver_id: bob })
        .await
        .unwrap();
    ctx.like_service
        .update_like_status(
            like.id,
            bob,
            UpdateLikeStatusRequest {
                status: LikeDecision::Accepted,
            },
        )
        .await
        .unwrap();

    let err = ctx
        .like_service
        .update_like_status(
            like.id,
            bob,
            UpdateLikeStatusRequest {
                status: LikeDecision::Rejected,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(unwrap_domain(err), DomainError::LikeAlreadyProcessed);
}

#[tokio::test]
async fn received_list_only_shows_pending() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");
    let bob = ctx.store.add_user("Bob");
    let carol = ctx.store.add_user("Carol");

    let from_alice = ctx
        .like_service
        .send_like(alice, SendLikeRequest { receiver_id: carol })
        .await
        .unwrap();
    ctx.like_service
        .send_like(bob, SendLikeRequest { receiver_id: carol })
        .await
        .unwrap();
    ctx.like_service
        .update_like_status(
            from_alice.id,
            carol,
            UpdateLikeStatusRequest {
                status: LikeDecision::Rejected,
            },
        )
        .await
        .unwrap();

    let received = ctx.like_service.list_received(carol).await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].sender_id, bob);
    assert_eq!(ctx.like_service.pending_count(carol).await.unwrap(), 1);

    let sent = ctx.like_service.list_sent(alice).await.unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].status, LikeStatus::Rejected);
}

#[tokio::test]
async fn accepting_when_conversation_already_exists_still_succeeds() {
    let ctx = context();
    let (alice, bob, conversation_id) = establish_match(&ctx).await;

    // 既有会话在场时再次建立匹配（并发对账路径）
    let err = ctx
        .conversation_service
        .create_for_match(
            alice,
            bob,
            domain::LikeId::from(uuid::Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    match unwrap_domain(err) {
        DomainError::ConversationExists(existing) => assert_eq!(existing.id, conversation_id),
        other => panic!("expected ConversationExists, got {other:?}"),
    }
}

#[tokio::test]
async fn simultaneous_duplicate_sends_leave_one_winner() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");
    let bob = ctx.store.add_user("Bob");

    // 同一对用户的两次并发 send_like：唯一约束保证恰好一次成功
    let (first, second) = futures::join!(
        ctx.like_service
            .send_like(alice, SendLikeRequest { receiver_id: bob }),
        ctx.like_service
            .send_like(alice, SendLikeRequest { receiver_id: bob }),
    );

    let (winner, loser) = match (first, second) {
        (Ok(like), Err(err)) | (Err(err), Ok(like)) => (like, err),
        other => panic!("expected exactly one success, got {other:?}"),
    };
    match unwrap_domain(loser) {
        DomainError::LikeAlreadyExists(existing) => assert_eq!(existing.id, winner.id),
        other => panic!("expected LikeAlreadyExists, got {other:?}"),
    }
    // 败者不重复通知，接收方只看到一条
    assert_eq!(ctx.store.notifications_for(bob).len(), 1);
    assert_eq!(
        ctx.dispatcher.event_names_for(bob),
        vec!["notification:new", "like:received"]
    );
}

#[tokio::test]
async fn racing_accept_and_reject_only_processes_once() {
    let ctx = context();
    let alice = ctx.store.add_user("Alice");
    let bob = ctx.store.add_user("Bob");

    let like = ctx
        .like_service
        .send_like(alice, SendLikeRequest { receiver_id: bob })
        .await
        .unwrap();

    // 对同一条 pending like 并发提交两个相反决定
    let (accept, reject) = futures::join!(
        ctx.like_service.update_like_status(
            like.id,
            bob,
            UpdateLikeStatusRequest {
                status: LikeDecision::Accepted,
            },
        ),
        ctx.like_service.update_like_status(
            like.id,
            bob,
            UpdateLikeStatusRequest {
                status: LikeDecision::Rejected,
            },
        ),
    );

    let (winner, loser) = match (accept, reject) {
        (Ok(updated), Err(err)) | (Err(err), Ok(updated)) => (updated, err),
        other => panic!("expected exactly one success, got {other:?}"),
    };
    assert_eq!(unwrap_domain(loser), DomainError::LikeAlreadyProcessed);

    // 落库状态与胜者一致，会话只在 accept 胜出时出现
    assert_eq!(ctx.store.like(like.id).unwrap().status, winner.status);
    assert_eq!(
        ctx.store.conversation_for_pair(alice, bob).is_some(),
        winner.status == LikeStatus::Accepted
    );
}
