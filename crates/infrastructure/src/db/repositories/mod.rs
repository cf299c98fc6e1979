//! Postgres 仓库实现
//!
//! 竞态防御落在这一层：唯一索引冲突和条件更新失败统一翻译为
//! `RepositoryError::Conflict`，由应用层决定对账方式。

use domain::RepositoryError;

pub mod conversation_repository_impl;
pub mod like_repository_impl;
pub mod message_repository_impl;
pub mod notification_repository_impl;
pub mod user_repository_impl;

pub use conversation_repository_impl::PostgresConversationRepository;
pub use like_repository_impl::PostgresLikeRepository;
pub use message_repository_impl::PostgresMessageRepository;
pub use notification_repository_impl::PostgresNotificationRepository;
pub use user_repository_impl::PostgresUserRepository;

/// Postgres 23505 是唯一约束冲突。
pub(crate) fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            RepositoryError::Conflict
        }
        _ => RepositoryError::storage(err.to_string()),
    }
}
