//! Courses API handlers: catalogue CRUD and enrollment.
//!
//! ```text
//! GET    /api/v1/courses?page&limit&category&sort
//! POST   /api/v1/courses
//! GET    /api/v1/courses/{id}
//! PUT    /api/v1/courses/{id}
//! DELETE /api/v1/courses/{id}
//! POST   /api/v1/courses/{id}/enroll
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::domain::course::CourseChanges;
use crate::domain::ports::{CourseQuery, CourseSort};
use crate::domain::{Course, CourseId, Enrollment, Error, NewCourse, Role, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::guard::{require_roles, require_user};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

const MAX_PAGE_SIZE: u32 = 100;

fn parse_course_id(raw: &str) -> Result<CourseId, Error> {
    CourseId::new(raw).map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({ "field": "id" }))
    })
}

/// Raw listing parameters before validation.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct CourseListQuery {
    /// One-based page number, default 1.
    pub page: Option<u32>,
    /// Page size, 1 to 100, default 10.
    pub limit: Option<u32>,
    /// Restrict the listing to one category.
    pub category: Option<String>,
    /// Sort key, e.g. `title_asc` or `rating_desc`; default `id_asc`.
    pub sort: Option<String>,
}

impl TryFrom<CourseListQuery> for CourseQuery {
    type Error = Error;

    fn try_from(raw: CourseListQuery) -> Result<Self, Self::Error> {
        let defaults = CourseQuery::default();
        let page = raw.page.unwrap_or(defaults.page);
        if page < 1 {
            return Err(Error::invalid_request("page must be at least 1")
                .with_details(json!({ "field": "page" })));
        }
        let limit = raw.limit.unwrap_or(defaults.limit);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(Error::invalid_request(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            ))
            .with_details(json!({ "field": "limit" })));
        }
        let sort = match raw.sort.as_deref() {
            None => CourseSort::default(),
            Some(key) => key.parse().map_err(|err: crate::domain::ports::InvalidCourseSort| {
                Error::invalid_request(err.to_string()).with_details(json!({ "field": "sort" }))
            })?,
        };
        Ok(Self {
            page,
            limit,
            category: raw.category,
            sort,
        })
    }
}

/// Pagination envelope returned alongside each course page.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    fn for_page(query: &CourseQuery, total: u64) -> Self {
        let pages = total.div_ceil(u64::from(query.limit));
        Self {
            page: query.page,
            limit: query.limit,
            total,
            pages,
            has_next: u64::from(query.page) < pages,
            has_prev: query.page > 1,
        }
    }
}

/// One page of courses plus its pagination envelope.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CoursePageResponse {
    pub courses: Vec<Course>,
    pub pagination: Pagination,
}

/// List courses with pagination, filtering, and sorting.
#[utoipa::path(
    get,
    path = "/api/v1/courses",
    params(CourseListQuery),
    responses(
        (status = 200, description = "One page of courses", body = CoursePageResponse),
        (status = 400, description = "Invalid paging or sort parameters", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["courses"],
    operation_id = "listCourses"
)]
#[get("/courses")]
pub async fn list_courses(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<CourseListQuery>,
) -> ApiResult<web::Json<CoursePageResponse>> {
    require_user(&state.access, &session).await?;
    let query = CourseQuery::try_from(query.into_inner())?;
    let page = state.catalog.list(&query).await?;
    let pagination = Pagination::for_page(&query, page.total);
    Ok(web::Json(CoursePageResponse {
        courses: page.courses,
        pagination,
    }))
}

/// Course creation request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub instructor_id: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub max_students: Option<u32>,
}

/// Create a course. Teacher or admin only.
#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Created course", body = Course),
        (status = 400, description = "Invalid course fields", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown instructor", body = Error)
    ),
    tags = ["courses"],
    operation_id = "createCourse"
)]
#[post("/courses")]
pub async fn create_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateCourseRequest>,
) -> ApiResult<HttpResponse> {
    require_roles(&state.access, &session, &[Role::Teacher, Role::Admin]).await?;
    let payload = payload.into_inner();
    let instructor_id = UserId::new(&payload.instructor_id).map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({ "field": "instructorId" }))
    })?;
    let course = state
        .catalog
        .create(NewCourse {
            title: payload.title,
            description: payload.description,
            instructor_id,
            category: payload.category,
            max_students: payload.max_students,
        })
        .await?;
    info!(course = %course.id(), "course created");
    Ok(HttpResponse::Created().json(course))
}

/// Fetch one course.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown course", body = Error)
    ),
    tags = ["courses"],
    operation_id = "getCourse"
)]
#[get("/courses/{id}")]
pub async fn get_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Course>> {
    require_user(&state.access, &session).await?;
    let id = parse_course_id(&path.into_inner())?;
    let course = state.catalog.get(&id).await?;
    Ok(web::Json(course))
}

/// Course update request body; absent fields keep their current values.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub max_students: Option<u32>,
}

impl From<UpdateCourseRequest> for CourseChanges {
    fn from(raw: UpdateCourseRequest) -> Self {
        Self {
            title: raw.title,
            description: raw.description,
            category: raw.category,
            rating: raw.rating,
            max_students: raw.max_students,
        }
    }
}

/// Partially update a course. Teacher or admin only.
#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Updated course", body = Course),
        (status = 400, description = "Invalid course fields", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown course", body = Error)
    ),
    tags = ["courses"],
    operation_id = "updateCourse"
)]
#[put("/courses/{id}")]
pub async fn update_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<UpdateCourseRequest>,
) -> ApiResult<web::Json<Course>> {
    require_roles(&state.access, &session, &[Role::Teacher, Role::Admin]).await?;
    let id = parse_course_id(&path.into_inner())?;
    let course = state
        .catalog
        .update(&id, payload.into_inner().into())
        .await?;
    Ok(web::Json(course))
}

/// Delete a course, cascading to its enrollments. Teacher or admin only.
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 204, description = "Course and its enrollments deleted"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown course", body = Error)
    ),
    tags = ["courses"],
    operation_id = "deleteCourse"
)]
#[delete("/courses/{id}")]
pub async fn delete_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    require_roles(&state.access, &session, &[Role::Teacher, Role::Admin]).await?;
    let id = parse_course_id(&path.into_inner())?;
    state.catalog.remove(&id).await?;
    info!(course = %id, "course deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// Enroll the authenticated student into a course.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/enroll",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 201, description = "New enrollment", body = Enrollment),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown course", body = Error),
        (status = 409, description = "Already enrolled or course full", body = Error)
    ),
    tags = ["courses"],
    operation_id = "enroll"
)]
#[post("/courses/{id}/enroll")]
pub async fn enroll(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let student = require_roles(&state.access, &session, &[Role::Student]).await?;
    let course_id = parse_course_id(&path.into_inner())?;
    let enrollment = state
        .enrollment_guard
        .try_enroll(&course_id, student.id())
        .await?;
    info!(student = %student.id(), course = %course_id, "student enrolled");
    Ok(HttpResponse::Created().json(enrollment))
}
