//! Google OAuth 2.0 adapter for the identity provider port.
//!
//! Implements the authorization-code flow: the browser is sent to Google's
//! consent screen, and the callback code is exchanged server-side for an
//! OpenID Connect profile. Only the `sub`, `email`, and `name` claims are
//! consumed.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::domain::ports::{OAuthProfile, OAuthProvider, OAuthProviderError};

const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid email profile";

/// Credentials and redirect target for the Google flow.
///
/// The client secret is zeroised on drop.
pub struct GoogleOAuthConfig {
    client_id: String,
    client_secret: Zeroizing<String>,
    redirect_url: Url,
}

impl GoogleOAuthConfig {
    /// Bundle the registered client credentials with the callback URL.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Zeroizing::new(client_secret.into()),
            redirect_url,
        }
    }
}

/// OAuth provider talking to Google's endpoints over HTTPS.
pub struct GoogleOAuthProvider {
    config: GoogleOAuthConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    sub: String,
    email: String,
    name: String,
}

impl GoogleOAuthProvider {
    /// Create a provider with a fresh HTTP client.
    pub fn new(config: GoogleOAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, OAuthProviderError> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&params)
            .send()
            .await
            .map_err(|error| OAuthProviderError::transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthProviderError::exchange(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|error| OAuthProviderError::exchange(error.to_string()))?;
        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<OAuthProfile, OAuthProviderError> {
        let response = self
            .http
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| OAuthProviderError::transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthProviderError::exchange(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }
        let info: UserInfoResponse = response
            .json()
            .await
            .map_err(|error| OAuthProviderError::malformed_profile(error.to_string()))?;
        OAuthProfile::try_from_claims(info.sub, info.email, info.name)
            .map_err(|error| OAuthProviderError::malformed_profile(error.to_string()))
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuthProvider {
    fn authorization_url(&self, state: &str) -> Result<Url, OAuthProviderError> {
        let mut url = Url::parse(AUTHORIZATION_ENDPOINT)
            .map_err(|error| OAuthProviderError::transport(error.to_string()))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_url.as_str())
            .append_pair("scope", SCOPES)
            .append_pair("state", state);
        Ok(url)
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthProfile, OAuthProviderError> {
        let access_token = self.fetch_access_token(code).await?;
        self.fetch_profile(&access_token).await
    }
}

/// Placeholder provider used when no Google credentials are configured.
///
/// Every call fails with [`OAuthProviderError::Unconfigured`], which the
/// login endpoints surface as 503.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredOAuthProvider;

#[async_trait]
impl OAuthProvider for UnconfiguredOAuthProvider {
    fn authorization_url(&self, _state: &str) -> Result<Url, OAuthProviderError> {
        Err(OAuthProviderError::unconfigured(
            "set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET to enable login",
        ))
    }

    async fn exchange_code(&self, _code: &str) -> Result<OAuthProfile, OAuthProviderError> {
        Err(OAuthProviderError::unconfigured(
            "set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET to enable login",
        ))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn provider() -> GoogleOAuthProvider {
        GoogleOAuthProvider::new(GoogleOAuthConfig::new(
            "client-123",
            "secret-456",
            Url::parse("https://app.example.com/auth/callback").expect("valid url"),
        ))
    }

    #[rstest]
    fn authorization_url_carries_required_parameters() {
        let url = provider()
            .authorization_url("opaque-state")
            .expect("url builds");

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(params.get("client_id").map(String::as_str), Some("client-123"));
        assert_eq!(params.get("state").map(String::as_str), Some("opaque-state"));
        assert_eq!(params.get("scope").map(String::as_str), Some(SCOPES));
        assert!(!url.as_str().contains("secret-456"), "secret must not leak");
    }

    #[rstest]
    fn userinfo_payload_deserialises_into_claims() {
        let info: UserInfoResponse = serde_json::from_str(
            r#"{"sub":"g-1","email":"ada@example.com","name":"Ada","picture":"ignored"}"#,
        )
        .expect("valid payload");
        let profile = OAuthProfile::try_from_claims(info.sub, info.email, info.name)
            .expect("claims validate");
        assert_eq!(profile.external_id.as_ref(), "g-1");
    }

    #[rstest]
    #[tokio::test]
    async fn unconfigured_provider_rejects_both_legs() {
        let provider = UnconfiguredOAuthProvider;
        assert!(matches!(
            provider.authorization_url("state"),
            Err(OAuthProviderError::Unconfigured { .. })
        ));
        assert!(matches!(
            provider.exchange_code("code").await,
            Err(OAuthProviderError::Unconfigured { .. })
        ));
    }
}
