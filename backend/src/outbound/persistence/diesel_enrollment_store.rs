//! Diesel-backed implementation of the enrollment store port.
//!
//! The guarded insert runs inside a serializable transaction so the duplicate
//! check, the seat count, and the insert observe one consistent snapshot.
//! Concurrent attempts that would overfill a course abort with a
//! serialization failure and are retried; the unique index on
//! `(student_id, course_id)` backstops the duplicate check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::RunQueryDsl;

use crate::domain::course::CourseId;
use crate::domain::enrollment::Enrollment;
use crate::domain::ports::{EnrollOutcome, EnrollmentStore, EnrollmentStoreError};
use crate::domain::user::UserId;

use super::error_map::{map_diesel_error, map_pool_error};
use super::models::{EnrollmentRow, NewEnrollmentRow};
use super::pool::{DbPool, PoolError};
use super::schema::enrollments;

/// Retry budget for serialization aborts before surfacing an error.
const MAX_ENROLL_ATTEMPTS: u32 = 3;

/// Enrollment store backed by the `enrollments` table.
#[derive(Clone)]
pub struct DieselEnrollmentStore {
    pool: DbPool,
}

impl DieselEnrollmentStore {
    /// Create a store using the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn try_enroll_once(
        &self,
        student_id: UserId,
        course_id: CourseId,
        capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<EnrollOutcome, DieselError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| DieselError::QueryBuilderError(error.to_string().into()))?;

        let student = *student_id.as_uuid();
        let course = *course_id.as_uuid();
        conn.build_transaction()
            .serializable()
            .run::<EnrollOutcome, DieselError, _>(|conn| {
                async move {
                    let existing: Option<EnrollmentRow> = enrollments::table
                        .filter(enrollments::student_id.eq(student))
                        .filter(enrollments::course_id.eq(course))
                        .select(EnrollmentRow::as_select())
                        .first(conn)
                        .await
                        .optional()?;
                    // Duplicate wins over full: a re-enrolling student is
                    // reported as already enrolled even with no seats left.
                    if existing.is_some() {
                        return Ok(EnrollOutcome::AlreadyEnrolled);
                    }

                    let seats_taken: i64 = enrollments::table
                        .filter(enrollments::course_id.eq(course))
                        .count()
                        .get_result(conn)
                        .await?;
                    if seats_taken >= i64::from(capacity) {
                        return Ok(EnrollOutcome::CourseFull);
                    }

                    let enrollment = Enrollment::start(student_id, course_id, now);
                    diesel::insert_into(enrollments::table)
                        .values(NewEnrollmentRow::from(&enrollment))
                        .execute(conn)
                        .await?;
                    Ok(EnrollOutcome::Enrolled(enrollment))
                }
                .scope_boxed()
            })
            .await
    }
}

fn pool_error(error: PoolError) -> EnrollmentStoreError {
    map_pool_error(error, EnrollmentStoreError::connection)
}

fn diesel_error(error: DieselError) -> EnrollmentStoreError {
    map_diesel_error(
        error,
        EnrollmentStoreError::query,
        EnrollmentStoreError::connection,
    )
}

fn into_enrollment(row: EnrollmentRow) -> Result<Enrollment, EnrollmentStoreError> {
    Enrollment::try_from(row).map_err(|error| EnrollmentStoreError::query(error.to_string()))
}

#[async_trait]
impl EnrollmentStore for DieselEnrollmentStore {
    async fn enroll(
        &self,
        student_id: &UserId,
        course_id: &CourseId,
        capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<EnrollOutcome, EnrollmentStoreError> {
        for attempt in 1..=MAX_ENROLL_ATTEMPTS {
            match self
                .try_enroll_once(*student_id, *course_id, capacity, now)
                .await
            {
                Ok(outcome) => return Ok(outcome),
                Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                    // Two first-time attempts raced past the duplicate check;
                    // the index caught the loser.
                    return Ok(EnrollOutcome::AlreadyEnrolled);
                }
                Err(DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, info))
                    if attempt < MAX_ENROLL_ATTEMPTS =>
                {
                    tracing::debug!(
                        attempt,
                        message = info.message(),
                        "enrollment transaction aborted, retrying"
                    );
                }
                Err(other) => return Err(diesel_error(other)),
            }
        }
        Err(EnrollmentStoreError::query(
            "enrollment transaction kept aborting under contention",
        ))
    }

    async fn find_by_student_and_course(
        &self,
        student_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, EnrollmentStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row: Option<EnrollmentRow> = enrollments::table
            .filter(enrollments::student_id.eq(student_id.as_uuid()))
            .filter(enrollments::course_id.eq(course_id.as_uuid()))
            .select(EnrollmentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;
        row.map(into_enrollment).transpose()
    }

    async fn count_by_course(&self, course_id: &CourseId) -> Result<u64, EnrollmentStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let count: i64 = enrollments::table
            .filter(enrollments::course_id.eq(course_id.as_uuid()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn list_by_student(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<Enrollment>, EnrollmentStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows: Vec<EnrollmentRow> = enrollments::table
            .filter(enrollments::student_id.eq(student_id.as_uuid()))
            .order(enrollments::enrolled_at.desc())
            .select(EnrollmentRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows.into_iter().map(into_enrollment).collect()
    }

    async fn delete_by_course(&self, course_id: &CourseId) -> Result<u64, EnrollmentStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let removed =
            diesel::delete(enrollments::table.filter(enrollments::course_id.eq(course_id.as_uuid())))
                .execute(&mut conn)
                .await
                .map_err(diesel_error)?;
        Ok(removed as u64)
    }
}
