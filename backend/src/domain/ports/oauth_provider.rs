//! Driven port for the external OAuth identity provider.
//!
//! Handlers never talk to Google directly: the login flow asks this port for
//! an authorization URL and exchanges the callback code for a verified
//! profile, so tests can substitute a deterministic provider.

use async_trait::async_trait;
use url::Url;

use crate::domain::user::{DisplayName, Email, ExternalId, UserValidationError};

use super::define_port_error;

define_port_error! {
    /// Failures raised by OAuth provider adapters.
    pub enum OAuthProviderError {
        /// No provider credentials are configured.
        Unconfigured => "oauth provider not configured: {message}",
        /// The provider endpoint could not be reached.
        Transport => "oauth provider unreachable: {message}",
        /// The provider rejected the code exchange.
        Exchange => "oauth code exchange failed: {message}",
        /// The provider returned a profile missing required claims.
        MalformedProfile => "oauth profile malformed: {message}",
    }
}

/// Verified identity claims returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub external_id: ExternalId,
    pub email: Email,
    pub display_name: DisplayName,
}

impl OAuthProfile {
    /// Validate raw provider claims into a profile.
    pub fn try_from_claims(
        subject: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        Ok(Self {
            external_id: ExternalId::new(subject)?,
            email: Email::new(email)?,
            display_name: DisplayName::new(name)?,
        })
    }
}

/// Port for delegating login to an external identity provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Build the authorization redirect URL carrying the session-bound state.
    fn authorization_url(&self, state: &str) -> Result<Url, OAuthProviderError>;

    /// Exchange an authorization code for the user's verified profile.
    async fn exchange_code(&self, code: &str) -> Result<OAuthProfile, OAuthProviderError>;
}

/// Deterministic provider for tests and database-less development runs.
///
/// Every exchange yields the same profile regardless of the code.
#[derive(Debug, Clone)]
pub struct FixtureOAuthProvider {
    profile: OAuthProfile,
}

impl Default for FixtureOAuthProvider {
    fn default() -> Self {
        let profile = OAuthProfile::try_from_claims(
            "fixture-subject-1",
            "fixture@example.com",
            "Fixture User",
        )
        .unwrap_or_else(|err| panic!("fixture claims must satisfy validation: {err}"));
        Self { profile }
    }
}

impl FixtureOAuthProvider {
    /// Create a provider that always yields `profile`.
    pub fn with_profile(profile: OAuthProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl OAuthProvider for FixtureOAuthProvider {
    fn authorization_url(&self, state: &str) -> Result<Url, OAuthProviderError> {
        let mut url = Url::parse("https://accounts.example.com/authorize")
            .unwrap_or_else(|err| panic!("fixture url must parse: {err}"));
        url.query_pairs_mut().append_pair("state", state);
        Ok(url)
    }

    async fn exchange_code(&self, _code: &str) -> Result<OAuthProfile, OAuthProviderError> {
        Ok(self.profile.clone())
    }
}
