//! Auth API handlers: OAuth login, callback, logout, and the profile view.
//!
//! ```text
//! GET  /api/v1/auth/login
//! GET  /api/v1/auth/callback?code=...&state=...
//! POST /api/v1/auth/logout
//! GET  /api/v1/auth/profile
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Error, User};
use crate::inbound::http::ApiResult;
use crate::inbound::http::guard::require_user;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Query parameters delivered by the provider on the callback leg.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

/// Begin the OAuth login flow with a redirect to the provider.
#[utoipa::path(
    get,
    path = "/api/v1/auth/login",
    responses(
        (status = 302, description = "Redirect to the identity provider"),
        (status = 503, description = "OAuth login is not configured", body = Error)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[get("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let oauth_state = Uuid::new_v4().to_string();
    let url = state.login.authorization_url(&oauth_state)?;
    session.persist_oauth_state(&oauth_state)?;
    Ok(HttpResponse::Found()
        .insert_header(("Location", url.to_string()))
        .finish())
}

/// Complete the OAuth flow: verify state, exchange the code, bind the session.
#[utoipa::path(
    get,
    path = "/api/v1/auth/callback",
    params(CallbackQuery),
    responses(
        (status = 200, description = "Logged in", body = User),
        (status = 401, description = "State mismatch or rejected code", body = Error),
        (status = 503, description = "Identity provider unavailable", body = Error)
    ),
    tags = ["auth"],
    operation_id = "loginCallback",
    security([])
)]
#[get("/auth/callback")]
pub async fn callback(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<CallbackQuery>,
) -> ApiResult<web::Json<User>> {
    let expected = session.take_oauth_state()?;
    if expected.as_deref() != Some(query.state.as_str()) {
        return Err(Error::unauthorized("OAuth state mismatch"));
    }

    let user = state.login.complete(&query.code).await?;
    session.persist_user(user.id())?;
    info!(user_id = %user.id(), "user logged in");
    Ok(web::Json(user))
}

/// Clear the session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 200, description = "Session cleared")),
    tags = ["auth"],
    operation_id = "logout",
    security([])
)]
#[post("/auth/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.clear();
    HttpResponse::Ok().finish()
}

/// Return the authenticated user's own record.
#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not logged in", body = Error)
    ),
    tags = ["auth"],
    operation_id = "profile"
)]
#[get("/auth/profile")]
pub async fn profile(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<User>> {
    let user = require_user(&state.access, &session).await?;
    Ok(web::Json(user))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::Value;

    use super::*;
    use crate::inbound::http::state::HttpStatePorts;
    use crate::inbound::http::test_utils::test_session_middleware;

    fn test_app() -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let state = HttpState::new(HttpStatePorts::in_memory());
        App::new()
            .app_data(web::Data::new(state))
            .wrap(test_session_middleware())
            .service(
                web::scope("/api/v1")
                    .service(login)
                    .service(callback)
                    .service(logout)
                    .service(profile),
            )
    }

    fn session_cookie(
        res: &actix_web::dev::ServiceResponse,
    ) -> actix_web::cookie::Cookie<'static> {
        res.response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie set")
            .into_owned()
    }

    async fn login_redirect_state(
        app: &impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
    ) -> (actix_web::cookie::Cookie<'static>, String) {
        let res = test::call_service(
            app,
            test::TestRequest::get().uri("/api/v1/auth/login").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FOUND);
        let location = res
            .headers()
            .get("Location")
            .expect("redirect location")
            .to_str()
            .expect("ascii location")
            .to_owned();
        let url = url::Url::parse(&location).expect("valid redirect url");
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .expect("state parameter");
        (session_cookie(&res), state)
    }

    #[actix_web::test]
    async fn full_login_flow_binds_the_session() {
        let app = test::init_service(test_app()).await;
        let (cookie, state) = login_redirect_state(&app).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/v1/auth/callback?code=c&state={state}"))
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = session_cookie(&res);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(
            body.get("email").and_then(Value::as_str),
            Some("fixture@example.com")
        );
        assert_eq!(body.get("role").and_then(Value::as_str), Some("student"));

        let profile_res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/auth/profile")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(profile_res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn state_mismatch_is_unauthorised() {
        let app = test::init_service(test_app()).await;
        let (cookie, _) = login_redirect_state(&app).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/auth/callback?code=c&state=forged")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn callback_without_login_leg_is_unauthorised() {
        let app = test::init_service(test_app()).await;
        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/auth/callback?code=c&state=s")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn profile_without_session_is_unauthorised() {
        let app = test::init_service(test_app()).await;
        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/auth/profile")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(
            body.get("details")
                .and_then(|d| d.get("reason"))
                .and_then(Value::as_str),
            Some("unauthenticated")
        );
    }

    #[actix_web::test]
    async fn logout_clears_the_session() {
        let app = test::init_service(test_app()).await;
        let (cookie, state) = login_redirect_state(&app).await;
        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/v1/auth/callback?code=c&state={state}"))
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let cookie = session_cookie(&res);

        let logout_res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/auth/logout")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(logout_res.status(), StatusCode::OK);
        let cleared = session_cookie(&logout_res);
        assert!(cleared.value().is_empty());
    }
}
