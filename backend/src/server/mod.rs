//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::inbound::http::analytics::{admin_analytics, analytics};
use crate::inbound::http::auth::{callback, login, logout, profile};
use crate::inbound::http::courses::{
    create_course, delete_course, enroll, get_course, list_courses, update_course,
};
use crate::inbound::http::enrollments::list_student_enrollments;
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::inbound::http::users::{
    get_user, list_instructors, list_users, list_users_by_role, update_user_role,
};
use crate::middleware::Trace;
use crate::outbound::oauth::{GoogleOAuthConfig, GoogleOAuthProvider, UnconfiguredOAuthProvider};
use crate::outbound::persistence::{
    DbPool, DieselCourseStore, DieselEnrollmentStore, DieselUserDirectory,
};

/// Assemble the port implementations selected by the configuration.
///
/// A database pool selects the Diesel-backed stores; Google credentials
/// select the real OAuth provider. Each falls back independently, so a
/// database-less run still exercises the full HTTP surface.
fn build_ports(db_pool: Option<DbPool>, google: Option<GoogleOAuthConfig>) -> HttpStatePorts {
    let mut ports = HttpStatePorts::in_memory();
    if let Some(pool) = db_pool {
        ports.directory = Arc::new(DieselUserDirectory::new(pool.clone()));
        ports.courses = Arc::new(DieselCourseStore::new(pool.clone()));
        ports.enrollments = Arc::new(DieselEnrollmentStore::new(pool));
    }
    ports.oauth = match google {
        Some(google) => Arc::new(GoogleOAuthProvider::new(google)),
        None => Arc::new(UnconfiguredOAuthProvider),
    };
    ports
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    let api = web::scope("/api/v1")
        .wrap(session)
        .service(login)
        .service(callback)
        .service(logout)
        .service(profile)
        .service(list_users)
        .service(list_instructors)
        .service(list_users_by_role)
        .service(get_user)
        .service(update_user_role)
        .service(list_courses)
        .service(create_course)
        .service(get_course)
        .service(update_course)
        .service(delete_course)
        .service(enroll)
        .service(list_student_enrollments)
        .service(analytics)
        .service(admin_analytics);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        db_pool,
        google,
        analytics_key,
    } = config;

    let mut http_state = HttpState::new(build_ports(db_pool, google));
    if let Some(analytics_key) = analytics_key {
        http_state = http_state.with_analytics_key(analytics_key);
    }
    let http_state = web::Data::new(http_state);

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
