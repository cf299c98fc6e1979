//! 主应用程序入口
//!
//! 装配 Postgres 仓库、应用层服务与实时连接注册表，
//! 启动 Axum Web API 服务。

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use application::{
    services::{
        ConversationService, ConversationServiceDependencies, LikeService, LikeServiceDependencies,
        MessageService, MessageServiceDependencies, NotificationService,
        NotificationServiceDependencies,
    },
    Clock, RealtimeDispatcher, SystemClock,
};
use config::{is_production_env, AppConfig};
use infrastructure::{
    create_pg_pool, ConnectionRegistry, PostgresConversationRepository, PostgresLikeRepository,
    PostgresMessageRepository, PostgresNotificationRepository, PostgresUserRepository,
};
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 读取环境变量配置；生产环境（APP_ENV=production）校验失败拒绝启动
    let config = AppConfig::from_env_with_defaults();
    let production = std::env::var("APP_ENV")
        .map(|value| is_production_env(&value))
        .unwrap_or(false);
    match config.ensure_startup_safe(production) {
        Ok(None) => {}
        Ok(Some(err)) => tracing::warn!("configuration failed production validation: {err}"),
        Err(err) => anyhow::bail!("invalid production configuration: {err}"),
    }

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );

    let pg_pool = Arc::new(
        create_pg_pool(&config.database.url, config.database.max_connections).await?,
    );

    // 运行迁移
    sqlx::migrate!("../../migrations").run(pg_pool.as_ref()).await?;

    // 创建具体的 repository 实例
    let like_repository = Arc::new(PostgresLikeRepository::new(pg_pool.clone()));
    let conversation_repository = Arc::new(PostgresConversationRepository::new(pg_pool.clone()));
    let message_repository = Arc::new(PostgresMessageRepository::new(pg_pool.clone()));
    let notification_repository = Arc::new(PostgresNotificationRepository::new(pg_pool.clone()));
    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 连接注册表同时充当实时事件分发器
    let registry = Arc::new(ConnectionRegistry::default());
    let dispatcher = registry.clone() as Arc<dyn RealtimeDispatcher>;

    // 创建应用层服务；通知与会话服务被 like/message 服务复用
    let notification_service = Arc::new(NotificationService::new(NotificationServiceDependencies {
        notification_repository: notification_repository.clone(),
        user_repository: user_repository.clone(),
        dispatcher: dispatcher.clone(),
        clock: clock.clone(),
    }));

    let conversation_service = Arc::new(ConversationService::new(ConversationServiceDependencies {
        conversation_repository: conversation_repository.clone(),
        message_repository: message_repository.clone(),
        user_repository: user_repository.clone(),
        dispatcher: dispatcher.clone(),
        clock: clock.clone(),
    }));

    let like_service = Arc::new(LikeService::new(LikeServiceDependencies {
        like_repository,
        user_repository: user_repository.clone(),
        conversation_service: conversation_service.clone(),
        notification_service: notification_service.clone(),
        dispatcher: dispatcher.clone(),
        clock: clock.clone(),
    }));

    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository,
        conversation_repository,
        user_repository,
        notification_service: notification_service.clone(),
        dispatcher,
        clock,
    }));

    // 创建 JWT 服务
    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

    // 创建应用状态
    let state = AppState::new(
        like_service,
        conversation_service,
        message_service,
        notification_service,
        registry,
        jwt_service,
    );

    // 启动 Web 服务器
    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("匹配服务启动在 http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
