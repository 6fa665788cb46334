use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::services::{Mailer, OAuthService, PaystackClient};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc/池内部共享实现浅拷贝，每个请求克隆的成本极低。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | pool | SQLite 连接池 |
/// | jwt_service | JWT 认证服务 |
/// | paystack | 支付网关客户端 |
/// | mailer | 邮件服务 (fire-and-forget) |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub pool: SqlitePool,
    pub jwt_service: Arc<JwtService>,
    pub paystack: PaystackClient,
    pub oauth: OAuthService,
    pub mailer: Mailer,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/market.db, 迁移自动应用)
    /// 3. 各服务 (JWT, 支付网关, 邮件)
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        let db_path = config.database_path();
        let db_service = DbService::new(&db_path.to_string_lossy())
            .await
            .expect("Failed to initialize database");

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let paystack = PaystackClient::new(config.paystack.clone());
        let oauth = OAuthService::new(config.oauth.clone());
        let mailer = Mailer::new(&config.smtp);

        Self {
            config: config.clone(),
            pool: db_service.pool,
            jwt_service,
            paystack,
            oauth,
            mailer,
        }
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用
    ///
    /// 启动的任务：
    /// - 弃购购物车提醒扫描 (CartFollowupWorker)
    pub fn start_background_tasks(&self) {
        crate::services::CartFollowupWorker::new(self.pool.clone(), self.mailer.clone()).spawn();
    }

    /// In-memory state for handler-level tests
    #[cfg(test)]
    pub async fn for_tests() -> Self {
        let config = Config::from_env();
        let db_service = DbService::new_in_memory()
            .await
            .expect("Failed to initialize in-memory database");
        Self {
            pool: db_service.pool,
            jwt_service: Arc::new(JwtService::with_config(crate::auth::JwtConfig {
                secret: "test-secret-that-is-long-enough-123456".to_string(),
                expiration_minutes: 60,
                issuer: "market-server".to_string(),
            })),
            // Unroutable gateway: any attempted call fails fast
            paystack: PaystackClient::new(crate::core::PaystackConfig {
                secret_key: "sk_test".into(),
                public_key: "pk_test".into(),
                base_url: "http://127.0.0.1:1".into(),
                timeout_ms: 500,
            }),
            oauth: OAuthService::new(crate::core::OAuthConfig {
                google_client_id: String::new(),
                google_client_secret: String::new(),
                github_client_id: String::new(),
                github_client_secret: String::new(),
                callback_base_url: "http://127.0.0.1:1".into(),
            }),
            mailer: Mailer::disabled(),
            config,
        }
    }
}
