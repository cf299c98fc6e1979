//! 进程内实时连接注册表
//!
//! 维护 user_id 到零或多条活跃 WebSocket 连接的映射。
//! 分发是尽力而为：用户不在线就丢弃，发送失败只记日志并清理
//! 失效连接，等客户端重连后通过 REST 读取对账。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use application::realtime::{RealtimeDispatcher, RealtimeEvent};
use domain::UserId;

pub type ConnectionId = Uuid;

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<UserId, Vec<(ConnectionId, mpsc::UnboundedSender<RealtimeEvent>)>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接纳一条新连接，返回连接标识和事件接收端。
    /// 同一用户可以持有多条连接（多设备）。
    pub async fn register(
        &self,
        user_id: UserId,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<RealtimeEvent>) {
        let connection_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .write()
            .await
            .entry(user_id)
            .or_default()
            .push((connection_id, tx));
        debug!(%user_id, %connection_id, "realtime connection registered");
        (connection_id, rx)
    }

    pub async fn unregister(&self, user_id: UserId, connection_id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some(list) = connections.get_mut(&user_id) {
            list.retain(|(id, _)| *id != connection_id);
            if list.is_empty() {
                connections.remove(&user_id);
            }
        }
        debug!(%user_id, %connection_id, "realtime connection unregistered");
    }

    pub async fn is_online(&self, user_id: UserId) -> bool {
        self.connections.read().await.contains_key(&user_id)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .map(Vec::len)
            .sum()
    }
}

#[async_trait]
impl RealtimeDispatcher for ConnectionRegistry {
    async fn emit(&self, user_id: UserId, event: RealtimeEvent) {
        let mut connections = self.connections.write().await;
        let Some(list) = connections.get_mut(&user_id) else {
            debug!(%user_id, event = event.name(), "no active connections, event dropped");
            return;
        };

        // 发送失败说明接收任务已退出，顺手清理
        list.retain(|(connection_id, tx)| {
            if tx.send(event.clone()).is_err() {
                warn!(%user_id, %connection_id, event = event.name(), "stale connection dropped");
                false
            } else {
                true
            }
        });
        if list.is_empty() {
            connections.remove(&user_id);
        }
    }
}
