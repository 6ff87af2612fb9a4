//! Analytics API handlers.
//!
//! ```text
//! GET /api/v1/analytics?apiKey=...
//! GET /api/v1/admin/analytics
//! ```

use actix_web::{get, web};
use serde::Deserialize;

use crate::domain::{CourseAnalytics, Error, Role};
use crate::inbound::http::ApiResult;
use crate::inbound::http::guard::require_roles;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Query parameters for the key-gated analytics endpoint.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Course analytics for external reporting, gated by a shared API key.
///
/// No session is involved; the key is compared against server configuration.
#[utoipa::path(
    get,
    path = "/api/v1/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Course analytics", body = CourseAnalytics),
        (status = 403, description = "Missing or invalid API key", body = Error)
    ),
    tags = ["analytics"],
    operation_id = "analytics",
    security([])
)]
#[get("/analytics")]
pub async fn analytics(
    state: web::Data<HttpState>,
    query: web::Query<AnalyticsQuery>,
) -> ApiResult<web::Json<CourseAnalytics>> {
    let authorised = match (&state.analytics_key, &query.api_key) {
        (Some(expected), Some(given)) => expected == given,
        _ => false,
    };
    if !authorised {
        return Err(Error::forbidden("Invalid API key"));
    }
    Ok(web::Json(state.catalog.analytics().await?))
}

/// Course analytics for the admin dashboard.
#[utoipa::path(
    get,
    path = "/api/v1/admin/analytics",
    responses(
        (status = 200, description = "Course analytics", body = CourseAnalytics),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["analytics"],
    operation_id = "adminAnalytics"
)]
#[get("/admin/analytics")]
pub async fn admin_analytics(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<CourseAnalytics>> {
    require_roles(&state.access, &session, &[Role::Admin]).await?;
    Ok(web::Json(state.catalog.analytics().await?))
}
