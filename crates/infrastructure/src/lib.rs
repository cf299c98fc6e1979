//! 基础设施层：Postgres 仓库实现与进程内实时连接注册表。

pub mod connections;
pub mod db;

pub use connections::ConnectionRegistry;
pub use db::repositories::{
    PostgresConversationRepository, PostgresLikeRepository, PostgresMessageRepository,
    PostgresNotificationRepository, PostgresUserRepository,
};
pub use db::{create_pg_pool, DbPool};
