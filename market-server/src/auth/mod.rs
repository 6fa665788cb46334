//! 认证模块
//!
//! JWT + Argon2 认证体系：
//! - [`JwtService`] - 令牌生成与校验
//! - [`CurrentUser`] - 请求级身份（extractor 注入）
//! - 中间件：`require_auth` / `require_admin`

pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use extractor::OptionalUser;
pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
pub use middleware::{require_admin, require_auth};
pub use password::{hash_password, verify_password};

use shared::models::{Role, User};

/// Authenticated identity attached to a request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_vendor(&self) -> bool {
        self.role == Role::Vendor
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

impl TryFrom<Claims> for CurrentUser {
    type Error = String;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| format!("non-numeric subject: {}", claims.sub))?;
        let role = claims.role.parse::<Role>()?;
        Ok(Self {
            id,
            name: claims.name,
            email: claims.email,
            role,
        })
    }
}
