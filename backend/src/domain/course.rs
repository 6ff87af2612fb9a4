//! Course data model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::user::UserId;

/// Default category assigned when a course is created without one.
pub const DEFAULT_CATEGORY: &str = "general";
/// Default seat capacity for new courses.
pub const DEFAULT_MAX_STUDENTS: u32 = 50;
/// Largest seat capacity a course may declare; bounded by the storage column.
pub const MAX_COURSE_CAPACITY: u32 = i32::MAX as u32;

/// Validation errors returned by [`Course`] constructors.
#[derive(Debug, Clone, PartialEq)]
pub enum CourseValidationError {
    InvalidId,
    EmptyTitle,
    ZeroCapacity,
    CapacityTooLarge { value: u32 },
    RatingOutOfRange { value: f64 },
}

impl fmt::Display for CourseValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId => write!(f, "course id must be a valid UUID"),
            Self::EmptyTitle => write!(f, "course title must not be empty"),
            Self::ZeroCapacity => write!(f, "course capacity must be at least one seat"),
            Self::CapacityTooLarge { value } => {
                write!(
                    f,
                    "course capacity {value} exceeds the maximum of {MAX_COURSE_CAPACITY} seats"
                )
            }
            Self::RatingOutOfRange { value } => {
                write!(f, "course rating {value} is outside the range 0.0..=5.0")
            }
        }
    }
}

impl std::error::Error for CourseValidationError {}

/// Stable course identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(Uuid);

impl CourseId {
    /// Validate and construct a [`CourseId`] from string input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, CourseValidationError> {
        Uuid::parse_str(id.as_ref())
            .map(Self)
            .map_err(|_| CourseValidationError::InvalidId)
    }

    /// Construct a [`CourseId`] from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a new random [`CourseId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unvalidated component bundle used to construct a [`Course`].
#[derive(Debug, Clone)]
pub struct CourseDraft {
    pub id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: UserId,
    pub category: String,
    pub rating: f64,
    pub max_students: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Course offered on the platform.
///
/// ## Invariants
/// - `title` is non-empty once trimmed.
/// - `max_students` is in `1..=MAX_COURSE_CAPACITY`, so it always fits the
///   storage column; the enrollment count for this course never exceeds it
///   (enforced by the enrollment guard and store).
/// - `instructor_id` references a teacher or admin by convention; the
///   reference is validated at creation time, not by a database constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[schema(value_type = String, example = "7d9f4c1e-30a4-4bfa-9a4e-9f65f87a4f11")]
    id: CourseId,
    #[schema(example = "Systems Programming in Rust")]
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[schema(value_type = String)]
    instructor_id: UserId,
    #[schema(example = "tech")]
    category: String,
    rating: f64,
    max_students: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Course {
    /// Build a [`Course`], enforcing the aggregate invariants.
    pub fn new(draft: CourseDraft) -> Result<Self, CourseValidationError> {
        let CourseDraft {
            id,
            title,
            description,
            instructor_id,
            category,
            rating,
            max_students,
            created_at,
            updated_at,
        } = draft;

        if title.trim().is_empty() {
            return Err(CourseValidationError::EmptyTitle);
        }
        if max_students == 0 {
            return Err(CourseValidationError::ZeroCapacity);
        }
        if max_students > MAX_COURSE_CAPACITY {
            return Err(CourseValidationError::CapacityTooLarge {
                value: max_students,
            });
        }
        if !(0.0..=5.0).contains(&rating) {
            return Err(CourseValidationError::RatingOutOfRange { value: rating });
        }

        let category = if category.trim().is_empty() {
            DEFAULT_CATEGORY.to_owned()
        } else {
            category
        };

        Ok(Self {
            id,
            title,
            description,
            instructor_id,
            category,
            rating,
            max_students,
            created_at,
            updated_at,
        })
    }

    /// Stable course identifier.
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    /// Course title.
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Free-form course description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Identifier of the owning instructor.
    pub fn instructor_id(&self) -> &UserId {
        &self.instructor_id
    }

    /// Course category used for filtering and analytics.
    pub fn category(&self) -> &str {
        self.category.as_str()
    }

    /// Aggregate rating in `0.0..=5.0`.
    pub fn rating(&self) -> f64 {
        self.rating
    }

    /// Maximum number of enrolled students.
    pub fn max_students(&self) -> u32 {
        self.max_students
    }

    /// Record creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification timestamp.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply a partial update, bumping the update timestamp.
    ///
    /// Fields absent from `changes` keep their current value; the result is
    /// re-validated so an update can never break aggregate invariants.
    pub fn apply(
        self,
        changes: CourseChanges,
        now: DateTime<Utc>,
    ) -> Result<Self, CourseValidationError> {
        Self::new(CourseDraft {
            id: self.id,
            title: changes.title.unwrap_or(self.title),
            description: changes.description.or(self.description),
            instructor_id: self.instructor_id,
            category: changes.category.unwrap_or(self.category),
            rating: changes.rating.unwrap_or(self.rating),
            max_students: changes.max_students.unwrap_or(self.max_students),
            created_at: self.created_at,
            updated_at: now,
        })
    }
}

/// Partial update applied to an existing course.
#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub rating: Option<f64>,
    pub max_students: Option<u32>,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    fn draft() -> CourseDraft {
        let now = Utc::now();
        CourseDraft {
            id: CourseId::random(),
            title: "Systems Programming".to_owned(),
            description: None,
            instructor_id: UserId::random(),
            category: "tech".to_owned(),
            rating: 0.0,
            max_students: 50,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    fn valid_draft_builds() {
        let course = Course::new(draft()).expect("valid course");
        assert_eq!(course.category(), "tech");
        assert_eq!(course.max_students(), 50);
    }

    #[rstest]
    fn blank_category_falls_back_to_default() {
        let course = Course::new(CourseDraft {
            category: "  ".to_owned(),
            ..draft()
        })
        .expect("valid course");
        assert_eq!(course.category(), DEFAULT_CATEGORY);
    }

    #[rstest]
    #[case(CourseDraft { title: "  ".to_owned(), ..draft() }, CourseValidationError::EmptyTitle)]
    #[case(CourseDraft { max_students: 0, ..draft() }, CourseValidationError::ZeroCapacity)]
    #[case(
        CourseDraft { max_students: u32::MAX, ..draft() },
        CourseValidationError::CapacityTooLarge { value: u32::MAX }
    )]
    #[case(
        CourseDraft { rating: 5.5, ..draft() },
        CourseValidationError::RatingOutOfRange { value: 5.5 }
    )]
    fn invalid_drafts_are_rejected(
        #[case] draft: CourseDraft,
        #[case] expected: CourseValidationError,
    ) {
        assert_eq!(Course::new(draft).expect_err("must fail"), expected);
    }

    #[rstest]
    fn apply_preserves_unset_fields() {
        let course = Course::new(draft()).expect("valid course");
        let later = course.updated_at() + chrono::Duration::seconds(30);
        let updated = course
            .clone()
            .apply(
                CourseChanges {
                    rating: Some(4.5),
                    ..CourseChanges::default()
                },
                later,
            )
            .expect("valid update");
        assert_eq!(updated.title(), course.title());
        assert_eq!(updated.rating(), 4.5);
        assert_eq!(updated.updated_at(), later);
    }

    #[rstest]
    fn apply_cannot_break_invariants() {
        let course = Course::new(draft()).expect("valid course");
        let err = course
            .apply(
                CourseChanges {
                    max_students: Some(0),
                    ..CourseChanges::default()
                },
                Utc::now(),
            )
            .expect_err("zero capacity must fail");
        assert_eq!(err, CourseValidationError::ZeroCapacity);
    }
}
