//! Social Login Providers (OAuth 2.0 code flow)
//!
//! Google and GitHub. The server hands out the provider's authorization URL,
//! the callback exchanges the code for an access token and fetches the
//! profile; account matching happens at the handler layer.

use serde::Deserialize;

use crate::core::OAuthConfig;
use crate::utils::AppError;

/// Normalized profile from any provider
#[derive(Debug, Clone)]
pub struct OAuthUserInfo {
    pub provider_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Clone)]
pub struct OAuthService {
    config: OAuthConfig,
    client: reqwest::Client,
}

impl OAuthService {
    pub fn new(config: OAuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(10_000))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn redirect_uri(&self, provider: &str) -> String {
        format!(
            "{}/api/auth/{provider}/callback",
            self.config.callback_base_url.trim_end_matches('/')
        )
    }

    /// Provider authorization URL the client is redirected to
    pub fn authorization_url(&self, provider: &str) -> Result<String, AppError> {
        match provider {
            "google" => Ok(format!(
                "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile",
                self.config.google_client_id,
                self.redirect_uri("google"),
            )),
            "github" => Ok(format!(
                "https://github.com/login/oauth/authorize?client_id={}&redirect_uri={}&scope=read:user%20user:email",
                self.config.github_client_id,
                self.redirect_uri("github"),
            )),
            other => Err(AppError::not_found(format!("Unknown provider {other}"))),
        }
    }

    /// Exchange the authorization code and fetch the user profile
    pub async fn fetch_user(&self, provider: &str, code: &str) -> Result<OAuthUserInfo, AppError> {
        match provider {
            "google" => self.fetch_google(code).await,
            "github" => self.fetch_github(code).await,
            other => Err(AppError::not_found(format!("Unknown provider {other}"))),
        }
    }

    async fn fetch_google(&self, code: &str) -> Result<OAuthUserInfo, AppError> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        #[derive(Deserialize)]
        struct Profile {
            sub: String,
            email: Option<String>,
            name: Option<String>,
            picture: Option<String>,
        }

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", &self.config.google_client_id),
            ("client_secret", &self.config.google_client_secret),
            ("redirect_uri", &self.redirect_uri("google")),
            ("code", code),
        ];

        let token: TokenResponse = self
            .client
            .post("https://oauth2.googleapis.com/token")
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("Google token request failed: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::internal(format!("Google token parse failed: {e}")))?;

        let profile: Profile = self
            .client
            .get("https://openidconnect.googleapis.com/v1/userinfo")
            .bearer_auth(token.access_token)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("Google userinfo request failed: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::internal(format!("Google userinfo parse failed: {e}")))?;

        Ok(OAuthUserInfo {
            provider_id: profile.sub,
            email: profile.email,
            name: profile.name,
            avatar: profile.picture,
        })
    }

    async fn fetch_github(&self, code: &str) -> Result<OAuthUserInfo, AppError> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        #[derive(Deserialize)]
        struct Profile {
            id: i64,
            login: String,
            name: Option<String>,
            email: Option<String>,
            avatar_url: Option<String>,
        }

        let params = [
            ("client_id", self.config.github_client_id.as_str()),
            ("client_secret", self.config.github_client_secret.as_str()),
            ("redirect_uri", &self.redirect_uri("github")),
            ("code", code),
        ];

        let token: TokenResponse = self
            .client
            .post("https://github.com/login/oauth/access_token")
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("GitHub token request failed: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::internal(format!("GitHub token parse failed: {e}")))?;

        let profile: Profile = self
            .client
            .get("https://api.github.com/user")
            .header("User-Agent", "market-server")
            .bearer_auth(token.access_token)
            .send()
            .await
            .map_err(|e| AppError::internal(format!("GitHub user request failed: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::internal(format!("GitHub user parse failed: {e}")))?;

        Ok(OAuthUserInfo {
            provider_id: profile.id.to_string(),
            email: profile.email,
            name: profile.name.or(Some(profile.login)),
            avatar: profile.avatar_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> OAuthService {
        OAuthService::new(OAuthConfig {
            google_client_id: "google-id".into(),
            google_client_secret: "google-secret".into(),
            github_client_id: "github-id".into(),
            github_client_secret: "github-secret".into(),
            callback_base_url: "https://shop.example.com".into(),
        })
    }

    #[test]
    fn test_authorization_urls() {
        let svc = service();
        let google = svc.authorization_url("google").unwrap();
        assert!(google.contains("client_id=google-id"));
        assert!(google.contains("auth/google/callback"));

        let github = svc.authorization_url("github").unwrap();
        assert!(github.starts_with("https://github.com/login/oauth/authorize"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let svc = service();
        assert!(matches!(
            svc.authorization_url("myspace"),
            Err(AppError::NotFound(_))
        ));
    }
}
