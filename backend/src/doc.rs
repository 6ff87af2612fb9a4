//! OpenAPI documentation configuration.
//!
//! Defines the [`ApiDoc`] struct generating the OpenAPI specification for the
//! REST API: every HTTP endpoint from the inbound layer, the domain schemas
//! they exchange, and the session cookie security scheme. The generated
//! document backs Swagger UI in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Course, CourseAnalytics, Enrollment, EnrollmentStatus, Error, ErrorCode, Role, User};
use crate::inbound::http::courses::{
    CoursePageResponse, CreateCourseRequest, Pagination, UpdateCourseRequest,
};
use crate::inbound::http::users::RoleUpdateRequest;

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by GET /api/v1/auth/callback.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Learning platform API",
        description = "HTTP interface for OAuth login, course catalogue management, \
                       capacity-guarded enrollment, and health probes."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::callback,
        crate::inbound::http::auth::logout,
        crate::inbound::http::auth::profile,
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::list_instructors,
        crate::inbound::http::users::list_users_by_role,
        crate::inbound::http::users::get_user,
        crate::inbound::http::users::update_user_role,
        crate::inbound::http::courses::list_courses,
        crate::inbound::http::courses::create_course,
        crate::inbound::http::courses::get_course,
        crate::inbound::http::courses::update_course,
        crate::inbound::http::courses::delete_course,
        crate::inbound::http::courses::enroll,
        crate::inbound::http::enrollments::list_student_enrollments,
        crate::inbound::http::analytics::analytics,
        crate::inbound::http::analytics::admin_analytics,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        User,
        Role,
        Course,
        Enrollment,
        EnrollmentStatus,
        Error,
        ErrorCode,
        CourseAnalytics,
        Pagination,
        CoursePageResponse,
        CreateCourseRequest,
        UpdateCourseRequest,
        RoleUpdateRequest,
    )),
    tags(
        (name = "auth", description = "OAuth login, logout, and the session profile"),
        (name = "users", description = "User directory and role administration"),
        (name = "courses", description = "Course catalogue and enrollment"),
        (name = "enrollments", description = "Enrollment queries"),
        (name = "analytics", description = "Course analytics"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying OpenAPI schema field structure.

    use utoipa::OpenApi;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    use super::*;

    /// Assert that an Object schema contains a field with the given name.
    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[test]
    fn openapi_error_schema_has_required_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get("Error").expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
    }

    #[test]
    fn openapi_course_schema_uses_camel_case() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let course_schema = schemas.get("Course").expect("Course schema");

        assert_object_schema_has_field(course_schema, "instructorId");
        assert_object_schema_has_field(course_schema, "maxStudents");
    }

    #[test]
    fn openapi_registers_every_endpoint_group() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/auth/login",
            "/api/v1/courses/{id}/enroll",
            "/api/v1/enrollments/student/{id}",
            "/api/v1/admin/analytics",
            "/health/ready",
        ] {
            assert!(
                doc.paths.paths.contains_key(path),
                "document should register {path}"
            );
        }
    }
}
