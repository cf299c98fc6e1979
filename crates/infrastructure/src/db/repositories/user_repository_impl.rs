//! 用户只读仓库实现
//!
//! users 表由外部资料服务维护，这里只做读取。

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use application::repository::UserRepository;
use domain::{RepositoryError, UserId, UserProfile};

use crate::db::repositories::map_sqlx_err;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct UserRecord {
    id: Uuid,
    display_name: String,
    avatar_url: Option<String>,
}

impl From<UserRecord> for UserProfile {
    fn from(record: UserRecord) -> Self {
        UserProfile {
            id: UserId::from(record.id),
            display_name: record.display_name,
            avatar_url: record.avatar_url,
        }
    }
}

pub struct PostgresUserRepository {
    pool: Arc<DbPool>,
}

impl PostgresUserRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_profile(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, display_name, avatar_url FROM users WHERE id = $1"#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(UserProfile::from))
    }
}
