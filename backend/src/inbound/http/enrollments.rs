//! Enrollments API handlers.
//!
//! ```text
//! GET /api/v1/enrollments/student/{id}
//! ```

use actix_web::{get, web};
use serde_json::json;

use crate::domain::ports::EnrollmentStoreError;
use crate::domain::{Enrollment, Error, Role, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::guard::require_user;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

fn map_enrollment_store_error(err: EnrollmentStoreError) -> Error {
    match err {
        EnrollmentStoreError::Connection { message } => {
            Error::service_unavailable(format!("enrollment store unavailable: {message}"))
        }
        EnrollmentStoreError::Query { message } => {
            Error::internal(format!("enrollment store error: {message}"))
        }
    }
}

/// List a student's enrollments, newest first.
///
/// A student may only read their own; teachers and admins may read anyone's.
#[utoipa::path(
    get,
    path = "/api/v1/enrollments/student/{id}",
    params(("id" = String, Path, description = "Student id")),
    responses(
        (status = 200, description = "The student's enrollments", body = [Enrollment]),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Students may only read their own enrollments", body = Error)
    ),
    tags = ["enrollments"],
    operation_id = "listStudentEnrollments"
)]
#[get("/enrollments/student/{id}")]
pub async fn list_student_enrollments(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<Enrollment>>> {
    let caller = require_user(&state.access, &session).await?;
    let student_id = UserId::new(&path.into_inner()).map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({ "field": "id" }))
    })?;

    if caller.role() == Role::Student && caller.id() != &student_id {
        return Err(
            Error::forbidden("Students may only view their own enrollments")
                .with_details(json!({ "reason": "forbidden" })),
        );
    }

    let enrollments = state
        .enrollments
        .list_by_student(&student_id)
        .await
        .map_err(map_enrollment_store_error)?;
    Ok(web::Json(enrollments))
}
