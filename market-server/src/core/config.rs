use crate::auth::JwtConfig;

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/market | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | FRONTEND_URL | http://localhost:3000 | 密码重置链接的前端地址 |
/// | PAYSTACK_SECRET_KEY | - | 支付网关私钥 |
/// | PAYSTACK_PUBLIC_KEY | - | 支付网关公钥 (返回给客户端) |
/// | PAYSTACK_BASE_URL | https://api.paystack.co | 支付网关地址 |
/// | PAYSTACK_TIMEOUT_MS | 10000 | 网关请求超时 (毫秒) |
/// | SMTP_HOST | - | 未设置时邮件仅写日志 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/market HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 前端地址 (密码重置链接)
    pub frontend_url: String,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 支付网关配置
    pub paystack: PaystackConfig,
    /// 邮件配置
    pub smtp: SmtpConfig,
    /// 社交登录配置
    pub oauth: OAuthConfig,
}

/// 支付网关配置
#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub secret_key: String,
    pub public_key: String,
    pub base_url: String,
    /// 单次请求超时；网关调用不做重试 (fail closed)
    pub timeout_ms: u64,
}

impl PaystackConfig {
    pub fn from_env() -> Self {
        Self {
            secret_key: std::env::var("PAYSTACK_SECRET_KEY").unwrap_or_default(),
            public_key: std::env::var("PAYSTACK_PUBLIC_KEY").unwrap_or_default(),
            base_url: std::env::var("PAYSTACK_BASE_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".into()),
            timeout_ms: std::env::var("PAYSTACK_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
        }
    }
}

/// 社交登录配置 (OAuth 2.0 code flow)
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub google_client_id: String,
    pub google_client_secret: String,
    pub github_client_id: String,
    pub github_client_secret: String,
    /// 本服务对外地址，用于拼 redirect_uri
    pub callback_base_url: String,
}

impl OAuthConfig {
    pub fn from_env() -> Self {
        Self {
            google_client_id: std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            google_client_secret: std::env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            github_client_id: std::env::var("GITHUB_CLIENT_ID").unwrap_or_default(),
            github_client_secret: std::env::var("GITHUB_CLIENT_SECRET").unwrap_or_default(),
            callback_base_url: std::env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
        }
    }
}

/// 邮件配置 (SMTP)
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl SmtpConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("SMTP_HOST").ok(),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            user: std::env::var("SMTP_USER").unwrap_or_default(),
            pass: std::env::var("SMTP_PASS").unwrap_or_default(),
            from: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| "noreply@market.example.com".to_string()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.host.is_some()
    }
}

impl Config {
    /// 从环境变量加载配置，未设置时使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/market".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            jwt: JwtConfig::default(),
            paystack: PaystackConfig::from_env(),
            smtp: SmtpConfig::from_env(),
            oauth: OAuthConfig::from_env(),
        }
    }

    /// 数据库文件路径
    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.work_dir).join("market.db")
    }

    /// 日志目录
    pub fn log_dir(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}
