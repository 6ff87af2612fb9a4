//! Diesel-backed implementation of the course store port.

use std::collections::BTreeMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::RunQueryDsl;

use crate::domain::course::{Course, CourseId};
use crate::domain::ports::{CoursePage, CourseQuery, CourseSort, CourseStore, CourseStoreError};

use super::error_map::{map_diesel_error, map_pool_error};
use super::models::{CourseRow, CourseWriteRow};
use super::pool::{DbPool, PoolError};
use super::schema::{courses, enrollments};

/// Course store backed by the `courses` table.
///
/// Deletes cascade to `enrollments` inside one transaction so a removed
/// course never leaves orphaned memberships behind.
#[derive(Clone)]
pub struct DieselCourseStore {
    pool: DbPool,
}

impl DieselCourseStore {
    /// Create a store using the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> CourseStoreError {
    map_pool_error(error, CourseStoreError::connection)
}

fn diesel_error(error: DieselError) -> CourseStoreError {
    map_diesel_error(error, CourseStoreError::query, CourseStoreError::connection)
}

fn into_course(row: CourseRow) -> Result<Course, CourseStoreError> {
    Course::try_from(row).map_err(|error| CourseStoreError::query(error.to_string()))
}

#[async_trait]
impl CourseStore for DieselCourseStore {
    async fn find_by_id(&self, id: &CourseId) -> Result<Option<Course>, CourseStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row: Option<CourseRow> = courses::table
            .find(id.as_uuid())
            .select(CourseRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;
        row.map(into_course).transpose()
    }

    async fn insert(&self, course: &Course) -> Result<(), CourseStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        diesel::insert_into(courses::table)
            .values(CourseWriteRow::from(course))
            .execute(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(())
    }

    async fn update(&self, course: &Course) -> Result<bool, CourseStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows = diesel::update(courses::table.find(course.id().as_uuid()))
            .set(CourseWriteRow::from(course))
            .execute(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(rows > 0)
    }

    async fn delete(&self, id: &CourseId) -> Result<bool, CourseStoreError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let course_id = *id.as_uuid();
        conn.transaction::<bool, DieselError, _>(|conn| {
            async move {
                diesel::delete(enrollments::table.filter(enrollments::course_id.eq(course_id)))
                    .execute(conn)
                    .await?;
                let rows = diesel::delete(courses::table.find(course_id))
                    .execute(conn)
                    .await?;
                Ok(rows > 0)
            }
            .scope_boxed()
        })
        .await
        .map_err(diesel_error)
    }

    async fn list(&self, query: &CourseQuery) -> Result<CoursePage, CourseStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let total: i64 = match &query.category {
            Some(category) => {
                courses::table
                    .filter(courses::category.eq(category))
                    .count()
                    .get_result(&mut conn)
                    .await
            }
            None => courses::table.count().get_result(&mut conn).await,
        }
        .map_err(diesel_error)?;

        let mut select = courses::table
            .select(CourseRow::as_select())
            .into_boxed();
        if let Some(category) = &query.category {
            select = select.filter(courses::category.eq(category));
        }
        select = match query.sort {
            CourseSort::IdAsc => select.order(courses::id.asc()),
            CourseSort::IdDesc => select.order(courses::id.desc()),
            CourseSort::TitleAsc => select.order(courses::title.asc()),
            CourseSort::TitleDesc => select.order(courses::title.desc()),
            CourseSort::RatingAsc => select.order(courses::rating.asc()),
            CourseSort::RatingDesc => select.order(courses::rating.desc()),
        };

        let rows: Vec<CourseRow> = select
            .offset(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .limit(i64::from(query.limit))
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;

        Ok(CoursePage {
            courses: rows
                .into_iter()
                .map(into_course)
                .collect::<Result<_, _>>()?,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn category_counts(&self) -> Result<BTreeMap<String, u64>, CourseStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows: Vec<(String, i64)> = courses::table
            .group_by(courses::category)
            .select((courses::category, diesel::dsl::count_star()))
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(rows
            .into_iter()
            .map(|(category, count)| (category, u64::try_from(count).unwrap_or(0)))
            .collect())
    }
}
