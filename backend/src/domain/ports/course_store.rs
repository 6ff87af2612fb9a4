//! Driven port for course persistence.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::course::{Course, CourseId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by course store adapters.
    pub enum CourseStoreError {
        /// Store connection could not be established.
        Connection => "course store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query => "course store query failed: {message}",
    }
}

/// Sort order accepted by the course listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CourseSort {
    #[default]
    IdAsc,
    IdDesc,
    TitleAsc,
    TitleDesc,
    RatingAsc,
    RatingDesc,
}

impl CourseSort {
    /// Stable wire representation of the sort key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdAsc => "id_asc",
            Self::IdDesc => "id_desc",
            Self::TitleAsc => "title_asc",
            Self::TitleDesc => "title_desc",
            Self::RatingAsc => "rating_asc",
            Self::RatingDesc => "rating_desc",
        }
    }
}

/// Error returned when decoding an unknown sort key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort key {0:?}")]
pub struct InvalidCourseSort(pub String);

impl FromStr for CourseSort {
    type Err = InvalidCourseSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id_asc" => Ok(Self::IdAsc),
            "id_desc" => Ok(Self::IdDesc),
            "title_asc" => Ok(Self::TitleAsc),
            "title_desc" => Ok(Self::TitleDesc),
            "rating_asc" => Ok(Self::RatingAsc),
            "rating_desc" => Ok(Self::RatingDesc),
            other => Err(InvalidCourseSort(other.to_owned())),
        }
    }
}

/// Listing parameters: one-based page, page size, optional category filter.
#[derive(Debug, Clone)]
pub struct CourseQuery {
    pub page: u32,
    pub limit: u32,
    pub category: Option<String>,
    pub sort: CourseSort,
}

impl Default for CourseQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            category: None,
            sort: CourseSort::default(),
        }
    }
}

impl CourseQuery {
    /// Zero-based row offset for the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// One page of courses plus the total matching row count.
#[derive(Debug, Clone)]
pub struct CoursePage {
    pub courses: Vec<Course>,
    pub total: u64,
}

/// Port for reading and mutating course records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Fetch a course by identifier.
    async fn find_by_id(&self, id: &CourseId) -> Result<Option<Course>, CourseStoreError>;

    /// Persist a newly created course.
    async fn insert(&self, course: &Course) -> Result<(), CourseStoreError>;

    /// Replace an existing course record, returning false when it is absent.
    async fn update(&self, course: &Course) -> Result<bool, CourseStoreError>;

    /// Delete a course and cascade to its enrollments; false when absent.
    async fn delete(&self, id: &CourseId) -> Result<bool, CourseStoreError>;

    /// List one page of courses under the given filter and sort order.
    async fn list(&self, query: &CourseQuery) -> Result<CoursePage, CourseStoreError>;

    /// Count courses grouped by category, for the admin analytics view.
    async fn category_counts(&self) -> Result<BTreeMap<String, u64>, CourseStoreError>;
}

/// In-memory store used by tests and database-less development runs.
///
/// Deleting a course does not cascade here; the in-memory enrollment store is
/// independent, so callers wire cascade behaviour at the service level when
/// running without a database.
#[derive(Debug, Default)]
pub struct InMemoryCourseStore {
    courses: Mutex<HashMap<CourseId, Course>>,
}

impl InMemoryCourseStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CourseId, Course>> {
        self.courses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn sort(courses: &mut [Course], sort: CourseSort) {
        match sort {
            CourseSort::IdAsc => courses.sort_by_key(|c| *c.id().as_uuid()),
            CourseSort::IdDesc => {
                courses.sort_by_key(|c| std::cmp::Reverse(*c.id().as_uuid()));
            }
            CourseSort::TitleAsc => courses.sort_by(|a, b| a.title().cmp(b.title())),
            CourseSort::TitleDesc => courses.sort_by(|a, b| b.title().cmp(a.title())),
            CourseSort::RatingAsc => {
                courses.sort_by(|a, b| a.rating().total_cmp(&b.rating()));
            }
            CourseSort::RatingDesc => {
                courses.sort_by(|a, b| b.rating().total_cmp(&a.rating()));
            }
        }
    }
}

#[async_trait]
impl CourseStore for InMemoryCourseStore {
    async fn find_by_id(&self, id: &CourseId) -> Result<Option<Course>, CourseStoreError> {
        Ok(self.lock().get(id).cloned())
    }

    async fn insert(&self, course: &Course) -> Result<(), CourseStoreError> {
        self.lock().insert(*course.id(), course.clone());
        Ok(())
    }

    async fn update(&self, course: &Course) -> Result<bool, CourseStoreError> {
        let mut guard = self.lock();
        if !guard.contains_key(course.id()) {
            return Ok(false);
        }
        guard.insert(*course.id(), course.clone());
        Ok(true)
    }

    async fn delete(&self, id: &CourseId) -> Result<bool, CourseStoreError> {
        Ok(self.lock().remove(id).is_some())
    }

    async fn list(&self, query: &CourseQuery) -> Result<CoursePage, CourseStoreError> {
        let mut courses: Vec<Course> = self
            .lock()
            .values()
            .filter(|course| {
                query
                    .category
                    .as_deref()
                    .is_none_or(|category| course.category() == category)
            })
            .cloned()
            .collect();
        Self::sort(&mut courses, query.sort);

        let total = courses.len() as u64;
        let courses = courses
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.limit as usize)
            .collect();
        Ok(CoursePage { courses, total })
    }

    async fn category_counts(&self) -> Result<BTreeMap<String, u64>, CourseStoreError> {
        let mut counts = BTreeMap::new();
        for course in self.lock().values() {
            *counts.entry(course.category().to_owned()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
