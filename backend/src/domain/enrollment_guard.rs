//! Enrollment admission decisions.
//!
//! `EnrollmentGuard` is the only writer of enrollment records. It resolves
//! the course, then delegates the duplicate and capacity checks to the
//! store's atomic guarded insert, so the uniqueness and capacity invariants
//! hold even under concurrent attempts for the same course or student.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::domain::course::CourseId;
use crate::domain::enrollment::Enrollment;
use crate::domain::error::Error;
use crate::domain::ports::{
    CourseStore, CourseStoreError, EnrollOutcome, EnrollmentStore, EnrollmentStoreError,
};
use crate::domain::user::UserId;

/// Denials and infrastructure failures raised by enrollment attempts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrollmentError {
    /// The referenced course does not exist.
    #[error("course not found")]
    CourseNotFound,
    /// The student already holds an enrollment for this course.
    #[error("student already enrolled in this course")]
    AlreadyEnrolled,
    /// The course is at maximum capacity.
    #[error("course is at maximum capacity")]
    CourseFull,
    /// The course store could not answer.
    #[error(transparent)]
    CourseStore(#[from] CourseStoreError),
    /// The enrollment store could not answer.
    #[error(transparent)]
    EnrollmentStore(#[from] EnrollmentStoreError),
}

impl From<EnrollmentError> for Error {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::CourseNotFound => {
                Error::not_found("Course not found").with_details(json!({ "reason": "not_found" }))
            }
            EnrollmentError::AlreadyEnrolled => {
                Error::conflict("Student already enrolled in this course")
                    .with_details(json!({ "reason": "already_enrolled" }))
            }
            EnrollmentError::CourseFull => Error::capacity_exceeded("Course is at maximum capacity")
                .with_details(json!({ "reason": "full" })),
            EnrollmentError::CourseStore(inner) => map_course_store_error(inner),
            EnrollmentError::EnrollmentStore(inner) => match inner {
                EnrollmentStoreError::Connection { message } => {
                    Error::service_unavailable(format!("enrollment store unavailable: {message}"))
                }
                EnrollmentStoreError::Query { message } => {
                    Error::internal(format!("enrollment store error: {message}"))
                }
            },
        }
    }
}

pub(crate) fn map_course_store_error(err: CourseStoreError) -> Error {
    match err {
        CourseStoreError::Connection { message } => {
            Error::service_unavailable(format!("course store unavailable: {message}"))
        }
        CourseStoreError::Query { message } => {
            Error::internal(format!("course store error: {message}"))
        }
    }
}

/// Guard deciding whether a new enrollment may be created.
#[derive(Clone)]
pub struct EnrollmentGuard {
    courses: Arc<dyn CourseStore>,
    enrollments: Arc<dyn EnrollmentStore>,
}

impl EnrollmentGuard {
    /// Create a guard over the given stores.
    pub fn new(courses: Arc<dyn CourseStore>, enrollments: Arc<dyn EnrollmentStore>) -> Self {
        Self {
            courses,
            enrollments,
        }
    }

    /// Attempt to enroll `student_id` into `course_id`.
    ///
    /// Exactly one enrollment record is persisted on success; none on
    /// failure. Failures are request-scoped denials, never retried here.
    pub async fn try_enroll(
        &self,
        course_id: &CourseId,
        student_id: &UserId,
    ) -> Result<Enrollment, EnrollmentError> {
        let course = self
            .courses
            .find_by_id(course_id)
            .await?
            .ok_or(EnrollmentError::CourseNotFound)?;

        let outcome = self
            .enrollments
            .enroll(student_id, course_id, course.max_students(), Utc::now())
            .await?;

        match outcome {
            EnrollOutcome::Enrolled(enrollment) => Ok(enrollment),
            EnrollOutcome::AlreadyEnrolled => Err(EnrollmentError::AlreadyEnrolled),
            EnrollOutcome::CourseFull => Err(EnrollmentError::CourseFull),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use chrono::Utc;
    use rstest::rstest;

    use super::*;
    use crate::domain::course::{Course, CourseDraft};
    use crate::domain::error::ErrorCode;
    use crate::domain::ports::{InMemoryCourseStore, InMemoryEnrollmentStore, MockEnrollmentStore};

    async fn course_with_capacity(store: &InMemoryCourseStore, capacity: u32) -> Course {
        let now = Utc::now();
        let course = Course::new(CourseDraft {
            id: CourseId::random(),
            title: "Distributed Systems".to_owned(),
            description: None,
            instructor_id: UserId::random(),
            category: "tech".to_owned(),
            rating: 0.0,
            max_students: capacity,
            created_at: now,
            updated_at: now,
        })
        .expect("valid course");
        store.insert(&course).await.expect("insert succeeds");
        course
    }

    fn guard(
        courses: Arc<InMemoryCourseStore>,
        enrollments: Arc<InMemoryEnrollmentStore>,
    ) -> EnrollmentGuard {
        EnrollmentGuard::new(courses, enrollments)
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_course_is_reported_before_any_store_access() {
        let mut enrollments = MockEnrollmentStore::new();
        enrollments.expect_enroll().never();
        let guard = EnrollmentGuard::new(
            Arc::new(InMemoryCourseStore::new()),
            Arc::new(enrollments),
        );

        let err = guard
            .try_enroll(&CourseId::random(), &UserId::random())
            .await
            .expect_err("must deny");
        assert_eq!(err, EnrollmentError::CourseNotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn successful_enrollment_persists_one_record() {
        let courses = Arc::new(InMemoryCourseStore::new());
        let enrollments = Arc::new(InMemoryEnrollmentStore::new());
        let course = course_with_capacity(&courses, 5).await;
        let guard = guard(courses, Arc::clone(&enrollments));
        let student = UserId::random();

        let enrollment = guard
            .try_enroll(course.id(), &student)
            .await
            .expect("enrolls");
        assert_eq!(enrollment.student_id(), &student);
        assert_eq!(
            enrollments.count_by_course(course.id()).await.expect("count"),
            1
        );
    }

    #[rstest]
    #[tokio::test]
    async fn second_attempt_is_already_enrolled() {
        let courses = Arc::new(InMemoryCourseStore::new());
        let enrollments = Arc::new(InMemoryEnrollmentStore::new());
        let course = course_with_capacity(&courses, 5).await;
        let guard = guard(courses, enrollments);
        let student = UserId::random();

        guard
            .try_enroll(course.id(), &student)
            .await
            .expect("first attempt enrolls");
        let err = guard
            .try_enroll(course.id(), &student)
            .await
            .expect_err("second attempt must deny");
        assert_eq!(err, EnrollmentError::AlreadyEnrolled);
    }

    #[rstest]
    #[tokio::test]
    async fn full_course_denies_with_course_full() {
        let courses = Arc::new(InMemoryCourseStore::new());
        let enrollments = Arc::new(InMemoryEnrollmentStore::new());
        let course = course_with_capacity(&courses, 1).await;
        let guard = guard(courses, enrollments);

        guard
            .try_enroll(course.id(), &UserId::random())
            .await
            .expect("seat taken");
        let err = guard
            .try_enroll(course.id(), &UserId::random())
            .await
            .expect_err("must deny");
        assert_eq!(err, EnrollmentError::CourseFull);
    }

    #[rstest]
    #[case(EnrollmentError::CourseNotFound, ErrorCode::NotFound, "not_found")]
    #[case(EnrollmentError::AlreadyEnrolled, ErrorCode::Conflict, "already_enrolled")]
    #[case(EnrollmentError::CourseFull, ErrorCode::CapacityExceeded, "full")]
    fn denials_map_to_structured_reason_codes(
        #[case] err: EnrollmentError,
        #[case] code: ErrorCode,
        #[case] reason: &str,
    ) {
        let error: Error = err.into();
        assert_eq!(error.code(), code);
        assert_eq!(
            error
                .details()
                .and_then(|d| d.get("reason"))
                .and_then(|v| v.as_str()),
            Some(reason)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn capacity_one_race_admits_exactly_one_student() {
        let courses = Arc::new(InMemoryCourseStore::new());
        let enrollments = Arc::new(InMemoryEnrollmentStore::new());
        let course = course_with_capacity(&courses, 1).await;
        let guard = guard(courses, Arc::clone(&enrollments));

        let (student_a, student_b) = (UserId::random(), UserId::random());
        let (a, b) = tokio::join!(
            guard.try_enroll(course.id(), &student_a),
            guard.try_enroll(course.id(), &student_b),
        );
        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one concurrent attempt wins");
        assert!(
            [a, b]
                .into_iter()
                .filter_map(Result::err)
                .all(|e| e == EnrollmentError::CourseFull)
        );
        assert_eq!(
            enrollments.count_by_course(course.id()).await.expect("count"),
            1
        );
    }
}
