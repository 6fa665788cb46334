//! 服务模块 - 外部协作方与后台任务
//!
//! - [`PaystackClient`] - 支付网关 HTTP 客户端
//! - [`Mailer`] - 邮件服务 (fire-and-forget)
//! - [`OAuthService`] - 社交登录 (Google / GitHub)
//! - [`CartFollowupWorker`] - 弃购提醒扫描

pub mod cart_followup;
pub mod mailer;
pub mod oauth;
pub mod paystack;

pub use cart_followup::CartFollowupWorker;
pub use mailer::Mailer;
pub use oauth::{OAuthService, OAuthUserInfo};
pub use paystack::{PaystackClient, SubaccountRequest, VerifyOutcome};
