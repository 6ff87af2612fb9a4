//! Row structs bridging Diesel queries and the domain aggregates.
//!
//! Reads land in `*Row` structs and are converted into domain types through
//! fallible constructors so malformed rows surface as query errors instead of
//! panics. Writes go through `New*Row` structs built from validated domain
//! values.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::course::{Course, CourseDraft, CourseId};
use crate::domain::enrollment::{Enrollment, EnrollmentStatus};
use crate::domain::user::{DisplayName, Email, ExternalId, Role, User, UserDraft, UserId};

use super::schema::{courses, enrollments, users};

/// Error raised when a stored row cannot be converted into a domain value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("stored {entity} row {id} is invalid: {message}")]
pub(crate) struct RowConversionError {
    pub entity: &'static str,
    pub id: Uuid,
    pub message: String,
}

impl RowConversionError {
    fn new(entity: &'static str, id: Uuid, message: impl ToString) -> Self {
        Self {
            entity,
            id,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub external_id: String,
    pub display_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RowConversionError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let fail = move |message: &dyn std::fmt::Display| {
            RowConversionError::new("user", id, message.to_string())
        };
        Ok(User::new(UserDraft {
            id: UserId::from_uuid(row.id),
            email: Email::new(row.email.as_str()).map_err(|e| fail(&e))?,
            external_id: ExternalId::new(row.external_id.as_str()).map_err(|e| fail(&e))?,
            display_name: DisplayName::new(row.display_name.as_str()).map_err(|e| fail(&e))?,
            role: row.role.parse::<Role>().map_err(|e| fail(&e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub external_id: &'a str,
    pub display_name: &'a str,
    pub role: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> NewUserRow<'a> {
    /// Build an insertable row from a validated user.
    ///
    /// Returns `None` when the user carries no external id; directory inserts
    /// only happen during OAuth provisioning, where one is always present.
    pub fn from_user(user: &'a User) -> Option<Self> {
        Some(Self {
            id: *user.id().as_uuid(),
            email: user.email().as_ref(),
            external_id: user.external_id()?.as_ref(),
            display_name: user.display_name().as_ref(),
            role: user.role().as_str(),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        })
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CourseRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: Uuid,
    pub category: String,
    pub rating: f64,
    pub max_students: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CourseRow> for Course {
    type Error = RowConversionError;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        let max_students = u32::try_from(row.max_students)
            .map_err(|_| RowConversionError::new("course", row.id, "negative seat capacity"))?;
        Course::new(CourseDraft {
            id: CourseId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            instructor_id: UserId::from_uuid(row.instructor_id),
            category: row.category,
            rating: row.rating,
            max_students,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .map_err(|error| RowConversionError::new("course", row.id, error))
    }
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = courses)]
pub(crate) struct CourseWriteRow<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub instructor_id: Uuid,
    pub category: &'a str,
    pub rating: f64,
    pub max_students: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a Course> for CourseWriteRow<'a> {
    fn from(course: &'a Course) -> Self {
        Self {
            id: *course.id().as_uuid(),
            title: course.title(),
            description: course.description(),
            instructor_id: *course.instructor_id().as_uuid(),
            category: course.category(),
            // capacity fits i32: Course::new enforces 1..=MAX_COURSE_CAPACITY
            rating: course.rating(),
            max_students: course.max_students() as i32,
            created_at: course.created_at(),
            updated_at: course.updated_at(),
        }
    }
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EnrollmentRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub status: String,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = RowConversionError;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<EnrollmentStatus>()
            .map_err(|error| RowConversionError::new("enrollment", row.id, error))?;
        Ok(Enrollment::new(
            row.id,
            UserId::from_uuid(row.student_id),
            CourseId::from_uuid(row.course_id),
            row.enrolled_at,
            status,
        ))
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = enrollments)]
pub(crate) struct NewEnrollmentRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub status: String,
}

impl From<&Enrollment> for NewEnrollmentRow {
    fn from(enrollment: &Enrollment) -> Self {
        Self {
            id: *enrollment.id(),
            student_id: *enrollment.student_id().as_uuid(),
            course_id: *enrollment.course_id().as_uuid(),
            enrolled_at: enrollment.enrolled_at(),
            status: enrollment.status().as_str().to_owned(),
        }
    }
}
