//! OAuth login flow: code exchange, first-login provisioning, and lookup.

use std::sync::Arc;

use chrono::Utc;
use url::Url;

use crate::domain::error::Error;
use crate::domain::ports::{
    OAuthProfile, OAuthProvider, OAuthProviderError, UserDirectory, UserDirectoryError,
};
use crate::domain::user::User;

/// Failures raised while completing a login.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    /// The identity provider rejected or mangled the exchange.
    #[error(transparent)]
    Provider(#[from] OAuthProviderError),
    /// The user directory could not answer.
    #[error(transparent)]
    Directory(#[from] UserDirectoryError),
}

impl From<LoginError> for Error {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::Provider(inner) => match inner {
                OAuthProviderError::Unconfigured { .. } => {
                    Error::service_unavailable("OAuth login is not configured")
                }
                OAuthProviderError::Transport { message } => {
                    Error::service_unavailable(format!("identity provider unreachable: {message}"))
                }
                OAuthProviderError::Exchange { .. }
                | OAuthProviderError::MalformedProfile { .. } => {
                    Error::unauthorized("Authentication failed")
                }
            },
            LoginError::Directory(inner) => match inner {
                UserDirectoryError::Connection { message } => {
                    Error::service_unavailable(format!("user directory unavailable: {message}"))
                }
                UserDirectoryError::Query { message }
                | UserDirectoryError::Duplicate { message } => {
                    Error::internal(format!("user directory error: {message}"))
                }
            },
        }
    }
}

/// Login service orchestrating the provider and the user directory.
#[derive(Clone)]
pub struct LoginFlow {
    provider: Arc<dyn OAuthProvider>,
    directory: Arc<dyn UserDirectory>,
}

impl LoginFlow {
    /// Create a flow over the given provider and directory.
    pub fn new(provider: Arc<dyn OAuthProvider>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            provider,
            directory,
        }
    }

    /// Build the provider redirect URL carrying the session-bound state.
    pub fn authorization_url(&self, state: &str) -> Result<Url, LoginError> {
        Ok(self.provider.authorization_url(state)?)
    }

    /// Complete the callback leg: exchange the code and resolve the user,
    /// provisioning a student account on first login.
    pub async fn complete(&self, code: &str) -> Result<User, LoginError> {
        let profile = self.provider.exchange_code(code).await?;
        if let Some(user) = self
            .directory
            .find_by_external_id(&profile.external_id)
            .await?
        {
            return Ok(user);
        }
        self.provision(profile).await
    }

    async fn provision(&self, profile: OAuthProfile) -> Result<User, LoginError> {
        let user = User::first_login(
            profile.email,
            profile.external_id.clone(),
            profile.display_name,
            Utc::now(),
        );
        match self.directory.insert(&user).await {
            Ok(()) => Ok(user),
            // Lost a concurrent first-login race; the winner's record stands.
            Err(UserDirectoryError::Duplicate { .. }) => Ok(self
                .directory
                .find_by_external_id(&profile.external_id)
                .await?
                .ok_or_else(|| {
                    UserDirectoryError::query("duplicate user vanished during provisioning")
                })?),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::ports::{FixtureOAuthProvider, InMemoryUserDirectory, MockOAuthProvider};
    use crate::domain::user::Role;

    fn flow_with_directory(directory: Arc<InMemoryUserDirectory>) -> LoginFlow {
        LoginFlow::new(Arc::new(FixtureOAuthProvider::default()), directory)
    }

    #[rstest]
    #[tokio::test]
    async fn first_login_provisions_a_student() {
        let directory = Arc::new(InMemoryUserDirectory::new());
        let flow = flow_with_directory(Arc::clone(&directory));

        let user = flow.complete("auth-code").await.expect("logs in");
        assert_eq!(user.role(), Role::Student);
        assert_eq!(user.email().as_ref(), "fixture@example.com");
        assert_eq!(directory.list().await.expect("list").len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn repeat_login_reuses_the_existing_record() {
        let directory = Arc::new(InMemoryUserDirectory::new());
        let flow = flow_with_directory(Arc::clone(&directory));

        let first = flow.complete("code-1").await.expect("logs in");
        let second = flow.complete("code-2").await.expect("logs in");
        assert_eq!(first.id(), second.id());
        assert_eq!(directory.list().await.expect("list").len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn rejected_exchange_maps_to_unauthorized() {
        let mut provider = MockOAuthProvider::new();
        provider
            .expect_exchange_code()
            .returning(|_| Err(OAuthProviderError::exchange("invalid_grant")));
        let flow = LoginFlow::new(Arc::new(provider), Arc::new(InMemoryUserDirectory::new()));

        let err = flow.complete("bad-code").await.expect_err("must fail");
        let error: Error = err.into();
        assert_eq!(error.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    #[tokio::test]
    async fn unreachable_provider_maps_to_service_unavailable() {
        let mut provider = MockOAuthProvider::new();
        provider
            .expect_exchange_code()
            .returning(|_| Err(OAuthProviderError::transport("connection refused")));
        let flow = LoginFlow::new(Arc::new(provider), Arc::new(InMemoryUserDirectory::new()));

        let err = flow.complete("code").await.expect_err("must fail");
        let error: Error = err.into();
        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }
}
