//! Course catalogue use-cases: CRUD, listing, and the admin analytics view.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::course::{
    Course, CourseChanges, CourseDraft, CourseId, DEFAULT_CATEGORY, DEFAULT_MAX_STUDENTS,
};
use crate::domain::enrollment_guard::map_course_store_error;
use crate::domain::error::Error;
use crate::domain::ports::{CoursePage, CourseQuery, CourseStore, EnrollmentStore, UserDirectory};
use crate::domain::user::UserId;

/// Fields accepted when creating a course.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: UserId,
    pub category: Option<String>,
    pub max_students: Option<u32>,
}

/// Aggregate counts backing the admin analytics endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseAnalytics {
    pub total_courses: u64,
    /// Course counts keyed by category, sorted by category name.
    pub course_categories: BTreeMap<String, u64>,
}

/// Course management service used by the HTTP adapter.
#[derive(Clone)]
pub struct CourseCatalog {
    courses: Arc<dyn CourseStore>,
    enrollments: Arc<dyn EnrollmentStore>,
    directory: Arc<dyn UserDirectory>,
}

impl CourseCatalog {
    /// Create a catalogue over the given stores.
    pub fn new(
        courses: Arc<dyn CourseStore>,
        enrollments: Arc<dyn EnrollmentStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            courses,
            enrollments,
            directory,
        }
    }

    /// Create a course after verifying the instructor reference.
    ///
    /// The instructor must exist in the user directory; the teacher/admin
    /// role of the owner is a convention enforced by the callers' guards,
    /// not by this check.
    pub async fn create(&self, new_course: NewCourse) -> Result<Course, Error> {
        let instructor = self
            .directory
            .find_by_id(&new_course.instructor_id)
            .await
            .map_err(|err| Error::internal(format!("user directory error: {err}")))?;
        if instructor.is_none() {
            return Err(Error::not_found("Instructor not found"));
        }

        let now = Utc::now();
        let course = Course::new(CourseDraft {
            id: CourseId::random(),
            title: new_course.title,
            description: new_course.description,
            instructor_id: new_course.instructor_id,
            category: new_course
                .category
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned()),
            rating: 0.0,
            max_students: new_course.max_students.unwrap_or(DEFAULT_MAX_STUDENTS),
            created_at: now,
            updated_at: now,
        })
        .map_err(|err| Error::invalid_request(err.to_string()))?;

        self.courses
            .insert(&course)
            .await
            .map_err(map_course_store_error)?;
        Ok(course)
    }

    /// Fetch a course by identifier.
    pub async fn get(&self, id: &CourseId) -> Result<Course, Error> {
        self.courses
            .find_by_id(id)
            .await
            .map_err(map_course_store_error)?
            .ok_or_else(|| Error::not_found("Course not found"))
    }

    /// Apply a partial update to a course.
    pub async fn update(&self, id: &CourseId, changes: CourseChanges) -> Result<Course, Error> {
        let course = self.get(id).await?;
        let updated = course
            .apply(changes, Utc::now())
            .map_err(|err| Error::invalid_request(err.to_string()))?;

        let stored = self
            .courses
            .update(&updated)
            .await
            .map_err(map_course_store_error)?;
        if !stored {
            // Deleted between the read and the write; report as absent.
            return Err(Error::not_found("Course not found"));
        }
        Ok(updated)
    }

    /// Delete a course, cascading to its enrollments.
    pub async fn remove(&self, id: &CourseId) -> Result<(), Error> {
        // Cascade first so a crash between the two writes cannot leave
        // enrollments pointing at a deleted course.
        self.enrollments
            .delete_by_course(id)
            .await
            .map_err(|err| Error::internal(format!("enrollment store error: {err}")))?;
        let deleted = self
            .courses
            .delete(id)
            .await
            .map_err(map_course_store_error)?;
        if !deleted {
            return Err(Error::not_found("Course not found"));
        }
        Ok(())
    }

    /// List one page of courses.
    pub async fn list(&self, query: &CourseQuery) -> Result<CoursePage, Error> {
        self.courses.list(query).await.map_err(map_course_store_error)
    }

    /// Aggregate counts for the admin analytics view.
    pub async fn analytics(&self) -> Result<CourseAnalytics, Error> {
        let course_categories = self
            .courses
            .category_counts()
            .await
            .map_err(map_course_store_error)?;
        let total_courses = course_categories.values().sum();
        Ok(CourseAnalytics {
            total_courses,
            course_categories,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use chrono::Utc;
    use rstest::rstest;

    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::ports::{
        InMemoryCourseStore, InMemoryEnrollmentStore, InMemoryUserDirectory,
    };
    use crate::domain::user::{DisplayName, Email, ExternalId, Role, User, UserDraft};

    fn teacher() -> User {
        let now = Utc::now();
        User::new(UserDraft {
            id: UserId::random(),
            email: Email::new("teacher@example.com").expect("valid email"),
            external_id: ExternalId::new("g-teacher").expect("valid id"),
            display_name: DisplayName::new("Course Teacher").expect("valid name"),
            role: Role::Teacher,
            created_at: now,
            updated_at: now,
        })
    }

    struct Fixture {
        catalog: CourseCatalog,
        enrollments: Arc<InMemoryEnrollmentStore>,
        instructor: User,
    }

    fn fixture() -> Fixture {
        let instructor = teacher();
        let enrollments = Arc::new(InMemoryEnrollmentStore::new());
        let catalog = CourseCatalog::new(
            Arc::new(InMemoryCourseStore::new()),
            Arc::clone(&enrollments) as Arc<dyn EnrollmentStore>,
            Arc::new(InMemoryUserDirectory::with_users([instructor.clone()])),
        );
        Fixture {
            catalog,
            enrollments,
            instructor,
        }
    }

    fn new_course(instructor_id: UserId) -> NewCourse {
        NewCourse {
            title: "Operating Systems".to_owned(),
            description: Some("Scheduling and memory".to_owned()),
            instructor_id,
            category: None,
            max_students: None,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn create_applies_defaults() {
        let fx = fixture();
        let course = fx
            .catalog
            .create(new_course(*fx.instructor.id()))
            .await
            .expect("creates");
        assert_eq!(course.category(), DEFAULT_CATEGORY);
        assert_eq!(course.max_students(), DEFAULT_MAX_STUDENTS);
        assert_eq!(course.rating(), 0.0);
    }

    #[rstest]
    #[tokio::test]
    async fn create_rejects_unknown_instructor() {
        let fx = fixture();
        let err = fx
            .catalog
            .create(new_course(UserId::random()))
            .await
            .expect_err("must deny");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn create_rejects_zero_capacity() {
        let fx = fixture();
        let err = fx
            .catalog
            .create(NewCourse {
                max_students: Some(0),
                ..new_course(*fx.instructor.id())
            })
            .await
            .expect_err("must deny");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn update_missing_course_is_not_found() {
        let fx = fixture();
        let err = fx
            .catalog
            .update(&CourseId::random(), CourseChanges::default())
            .await
            .expect_err("must deny");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn remove_cascades_to_enrollments() {
        let fx = fixture();
        let course = fx
            .catalog
            .create(new_course(*fx.instructor.id()))
            .await
            .expect("creates");
        fx.enrollments
            .enroll(&UserId::random(), course.id(), 50, Utc::now())
            .await
            .expect("enrolls");

        fx.catalog.remove(course.id()).await.expect("removes");
        assert_eq!(
            fx.enrollments
                .count_by_course(course.id())
                .await
                .expect("count"),
            0
        );
        let err = fx.catalog.get(course.id()).await.expect_err("gone");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn analytics_counts_by_category() {
        let fx = fixture();
        for category in ["tech", "tech", "art"] {
            fx.catalog
                .create(NewCourse {
                    category: Some(category.to_owned()),
                    ..new_course(*fx.instructor.id())
                })
                .await
                .expect("creates");
        }

        let analytics = fx.catalog.analytics().await.expect("analytics");
        assert_eq!(analytics.total_courses, 3);
        assert_eq!(analytics.course_categories.get("tech"), Some(&2));
        assert_eq!(analytics.course_categories.get("art"), Some(&1));
    }
}
