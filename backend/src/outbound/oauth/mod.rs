//! Outbound adapters for external identity providers.

mod google;

pub use google::{GoogleOAuthConfig, GoogleOAuthProvider, UnconfiguredOAuthProvider};
