//! Backend entry-point: wires REST endpoints and OpenAPI docs.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use actix_web::cookie::{Key, SameSite};
use actix_web::web;
use diesel_async::RunQueryDsl;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;

use backend::inbound::http::health::HealthState;
use backend::outbound::oauth::GoogleOAuthConfig;
use backend::outbound::persistence::{DbPool, PoolConfig};
use backend::server::{ServerConfig, create_server};

const DB_PROBE_ATTEMPTS: u32 = 10;
const DB_PROBE_INTERVAL: Duration = Duration::from_secs(2);

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let key = load_session_key()?;
    let cookie_secure = env::var("SESSION_COOKIE_SECURE")
        .map(|v| v != "0")
        .unwrap_or(true);
    let bind_addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()
        .map_err(|e| std::io::Error::other(format!("invalid BIND_ADDR: {e}")))?;

    let mut config = ServerConfig::new(key, cookie_secure, SameSite::Lax, bind_addr);

    match connect_database().await? {
        Some(pool) => {
            probe_database(&pool).await?;
            config = config.with_db_pool(pool);
        }
        None => warn!("DATABASE_URL not set; using in-memory stores (dev only)"),
    }

    match load_google_config()? {
        Some(google) => config = config.with_google(google),
        None => warn!("Google OAuth credentials not set; login endpoints will answer 503"),
    }

    if let Ok(analytics_key) = env::var("ANALYTICS_API_KEY") {
        config = config.with_analytics_key(analytics_key);
    }

    let health_state = web::Data::new(HealthState::new());
    info!(addr = %bind_addr, "starting server");
    create_server(health_state, config)?.await
}

fn load_session_key() -> std::io::Result<Key> {
    let key_path =
        env::var("SESSION_KEY_FILE").unwrap_or_else(|_| "/var/run/secrets/session_key".into());
    match std::fs::read(&key_path) {
        Ok(bytes) => Ok(Key::derive_from(&bytes)),
        Err(e) => {
            let allow_dev = env::var("SESSION_ALLOW_EPHEMERAL").ok().as_deref() == Some("1");
            if cfg!(debug_assertions) || allow_dev {
                warn!(path = %key_path, error = %e, "using temporary session key (dev only)");
                Ok(Key::generate())
            } else {
                Err(std::io::Error::other(format!(
                    "failed to read session key at {key_path}: {e}"
                )))
            }
        }
    }
}

async fn connect_database() -> std::io::Result<Option<DbPool>> {
    let Ok(database_url) = env::var("DATABASE_URL") else {
        return Ok(None);
    };
    let pool = DbPool::new(PoolConfig::new(database_url))
        .await
        .map_err(|e| std::io::Error::other(format!("database pool setup failed: {e}")))?;
    Ok(Some(pool))
}

/// Wait for the database to accept queries before serving traffic.
async fn probe_database(pool: &DbPool) -> std::io::Result<()> {
    for attempt in 1..=DB_PROBE_ATTEMPTS {
        match pool.get().await {
            Ok(mut conn) => match diesel::sql_query("SELECT 1").execute(&mut conn).await {
                Ok(_) => {
                    info!(attempt, "database probe succeeded");
                    return Ok(());
                }
                Err(e) => warn!(attempt, error = %e, "database probe query failed"),
            },
            Err(e) => warn!(attempt, error = %e, "database probe checkout failed"),
        }
        tokio::time::sleep(DB_PROBE_INTERVAL).await;
    }
    Err(std::io::Error::other(format!(
        "database unreachable after {DB_PROBE_ATTEMPTS} attempts"
    )))
}

fn load_google_config() -> std::io::Result<Option<GoogleOAuthConfig>> {
    let (Ok(client_id), Ok(client_secret)) =
        (env::var("GOOGLE_CLIENT_ID"), env::var("GOOGLE_CLIENT_SECRET"))
    else {
        return Ok(None);
    };
    let redirect_url = env::var("OAUTH_REDIRECT_URL")
        .map_err(|_| std::io::Error::other("OAUTH_REDIRECT_URL must be set alongside Google credentials"))?;
    let redirect_url = Url::parse(&redirect_url)
        .map_err(|e| std::io::Error::other(format!("invalid OAUTH_REDIRECT_URL: {e}")))?;
    Ok(Some(GoogleOAuthConfig::new(
        client_id,
        client_secret,
        redirect_url,
    )))
}
