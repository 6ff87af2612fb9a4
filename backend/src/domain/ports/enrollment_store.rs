//! Driven port for enrollment persistence.
//!
//! The store owns the enrollment uniqueness and capacity invariants: the
//! duplicate check, the seat count, and the insert happen inside one atomic
//! `enroll` operation so concurrent attempts can never both pass their checks.
//! Adapters back this with a serializable transaction (PostgreSQL) or a mutex
//! (in-memory).

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::course::CourseId;
use crate::domain::enrollment::Enrollment;
use crate::domain::user::UserId;

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by enrollment store adapters.
    pub enum EnrollmentStoreError {
        /// Store connection could not be established.
        Connection => "enrollment store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query => "enrollment store query failed: {message}",
    }
}

/// Result of an atomic guarded insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollOutcome {
    /// The enrollment was created; exactly one row was written.
    Enrolled(Enrollment),
    /// An enrollment for this `(student, course)` pair already exists.
    AlreadyEnrolled,
    /// The course has no remaining seats.
    CourseFull,
}

/// Port for reading and creating enrollment records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Atomically enroll a student when no duplicate exists and fewer than
    /// `capacity` students are enrolled. The duplicate check is evaluated
    /// before the capacity check so a re-enrolling student is reported as
    /// [`EnrollOutcome::AlreadyEnrolled`] even when the course is full.
    ///
    /// On success exactly one record is written, stamped with `now`; on any
    /// other outcome the store is left unchanged.
    async fn enroll(
        &self,
        student_id: &UserId,
        course_id: &CourseId,
        capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<EnrollOutcome, EnrollmentStoreError>;

    /// Fetch the enrollment for a `(student, course)` pair.
    async fn find_by_student_and_course(
        &self,
        student_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, EnrollmentStoreError>;

    /// Count enrollments for a course.
    async fn count_by_course(&self, course_id: &CourseId) -> Result<u64, EnrollmentStoreError>;

    /// List a student's enrollments, newest first.
    async fn list_by_student(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<Enrollment>, EnrollmentStoreError>;

    /// Delete every enrollment for a course; used by course-delete cascade.
    async fn delete_by_course(&self, course_id: &CourseId) -> Result<u64, EnrollmentStoreError>;
}

/// In-memory store used by tests and database-less development runs.
///
/// A single mutex serialises `enroll`, which is what makes the guarded insert
/// atomic under concurrent callers.
#[derive(Debug, Default)]
pub struct InMemoryEnrollmentStore {
    enrollments: Mutex<Vec<Enrollment>>,
}

impl InMemoryEnrollmentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Enrollment>> {
        self.enrollments
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryEnrollmentStore {
    async fn enroll(
        &self,
        student_id: &UserId,
        course_id: &CourseId,
        capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<EnrollOutcome, EnrollmentStoreError> {
        let mut guard = self.lock();

        let duplicate = guard
            .iter()
            .any(|e| e.student_id() == student_id && e.course_id() == course_id);
        if duplicate {
            return Ok(EnrollOutcome::AlreadyEnrolled);
        }

        let seats_taken = guard.iter().filter(|e| e.course_id() == course_id).count();
        if seats_taken as u64 >= u64::from(capacity) {
            return Ok(EnrollOutcome::CourseFull);
        }

        let enrollment = Enrollment::start(*student_id, *course_id, now);
        guard.push(enrollment.clone());
        Ok(EnrollOutcome::Enrolled(enrollment))
    }

    async fn find_by_student_and_course(
        &self,
        student_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, EnrollmentStoreError> {
        Ok(self
            .lock()
            .iter()
            .find(|e| e.student_id() == student_id && e.course_id() == course_id)
            .cloned())
    }

    async fn count_by_course(&self, course_id: &CourseId) -> Result<u64, EnrollmentStoreError> {
        Ok(self
            .lock()
            .iter()
            .filter(|e| e.course_id() == course_id)
            .count() as u64)
    }

    async fn list_by_student(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<Enrollment>, EnrollmentStoreError> {
        let mut enrollments: Vec<Enrollment> = self
            .lock()
            .iter()
            .filter(|e| e.student_id() == student_id)
            .cloned()
            .collect();
        enrollments.sort_by_key(|e| std::cmp::Reverse(e.enrolled_at()));
        Ok(enrollments)
    }

    async fn delete_by_course(&self, course_id: &CourseId) -> Result<u64, EnrollmentStoreError> {
        let mut guard = self.lock();
        let before = guard.len();
        guard.retain(|e| e.course_id() != course_id);
        Ok((before - guard.len()) as u64)
    }
}
