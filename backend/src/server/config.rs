//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use actix_web::cookie::{Key, SameSite};

use crate::outbound::oauth::GoogleOAuthConfig;
use crate::outbound::persistence::DbPool;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) google: Option<GoogleOAuthConfig>,
    pub(crate) analytics_key: Option<String>,
}

impl ServerConfig {
    /// Construct a server configuration using application preferences.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            db_pool: None,
            google: None,
            analytics_key: None,
        }
    }

    /// Attach a database connection pool for persistence adapters.
    ///
    /// When provided, the server uses the Diesel-backed stores; otherwise it
    /// falls back to the in-memory ones for database-less development runs.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Attach Google OAuth credentials.
    ///
    /// Without them the login endpoints answer 503.
    #[must_use]
    pub fn with_google(mut self, google: GoogleOAuthConfig) -> Self {
        self.google = Some(google);
        self
    }

    /// Attach the shared secret gating the public analytics endpoint.
    #[must_use]
    pub fn with_analytics_key(mut self, key: impl Into<String>) -> Self {
        self.analytics_key = Some(key.into());
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
