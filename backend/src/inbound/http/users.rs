//! Users API handlers.
//!
//! ```text
//! GET /api/v1/users
//! GET /api/v1/users/instructors
//! GET /api/v1/users/by-role/{role}
//! GET /api/v1/users/{id}
//! PUT /api/v1/users/{id}/role {"role":"teacher"}
//! ```

use actix_web::{get, put, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::domain::ports::UserDirectoryError;
use crate::domain::{Error, Role, User, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::guard::{require_roles, require_user};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

fn map_directory_error(err: UserDirectoryError) -> Error {
    match err {
        UserDirectoryError::Connection { message } => {
            Error::service_unavailable(format!("user directory unavailable: {message}"))
        }
        UserDirectoryError::Query { message } | UserDirectoryError::Duplicate { message } => {
            Error::internal(format!("user directory error: {message}"))
        }
    }
}

fn parse_user_id(raw: &str) -> Result<UserId, Error> {
    UserId::new(raw).map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({ "field": "id" }))
    })
}

fn parse_role(raw: &str) -> Result<Role, Error> {
    raw.parse::<Role>().map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({ "field": "role" }))
    })
}

/// List every user. Admin only.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Users", body = [User]),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<User>>> {
    require_roles(&state.access, &session, &[Role::Admin]).await?;
    let users = state.directory.list().await.map_err(map_directory_error)?;
    Ok(web::Json(users))
}

/// List users holding the teacher role.
#[utoipa::path(
    get,
    path = "/api/v1/users/instructors",
    responses(
        (status = 200, description = "Instructors", body = [User]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["users"],
    operation_id = "listInstructors"
)]
#[get("/users/instructors")]
pub async fn list_instructors(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<User>>> {
    require_user(&state.access, &session).await?;
    let users = state
        .directory
        .list_by_role(Role::Teacher)
        .await
        .map_err(map_directory_error)?;
    Ok(web::Json(users))
}

/// List users holding the given role.
#[utoipa::path(
    get,
    path = "/api/v1/users/by-role/{role}",
    params(("role" = String, Path, description = "Role name: student, teacher, or admin")),
    responses(
        (status = 200, description = "Users with the role", body = [User]),
        (status = 400, description = "Unknown role", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["users"],
    operation_id = "listUsersByRole"
)]
#[get("/users/by-role/{role}")]
pub async fn list_users_by_role(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<User>>> {
    require_user(&state.access, &session).await?;
    let role = parse_role(&path.into_inner())?;
    let users = state
        .directory
        .list_by_role(role)
        .await
        .map_err(map_directory_error)?;
    Ok(web::Json(users))
}

/// Fetch a single user by id.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown user", body = Error)
    ),
    tags = ["users"],
    operation_id = "getUser"
)]
#[get("/users/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<User>> {
    require_user(&state.access, &session).await?;
    let id = parse_user_id(&path.into_inner())?;
    let user = state
        .directory
        .find_by_id(&id)
        .await
        .map_err(map_directory_error)?
        .ok_or_else(|| Error::not_found("User not found"))?;
    Ok(web::Json(user))
}

/// Role mutation request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RoleUpdateRequest {
    /// New role name: `student`, `teacher`, or `admin`.
    pub role: String,
}

/// Replace a user's role. Admin only.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/role",
    params(("id" = String, Path, description = "User id")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Unknown role", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown user", body = Error)
    ),
    tags = ["users"],
    operation_id = "updateUserRole"
)]
#[put("/users/{id}/role")]
pub async fn update_user_role(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<RoleUpdateRequest>,
) -> ApiResult<web::Json<User>> {
    let admin = require_roles(&state.access, &session, &[Role::Admin]).await?;
    let id = parse_user_id(&path.into_inner())?;
    let role = parse_role(&payload.role)?;
    let updated = state
        .directory
        .update_role(&id, role)
        .await
        .map_err(map_directory_error)?
        .ok_or_else(|| Error::not_found("User not found"))?;
    info!(admin = %admin.id(), user = %updated.id(), role = %role, "role updated");
    Ok(web::Json(updated))
}
