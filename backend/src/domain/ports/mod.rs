//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod course_store;
mod enrollment_store;
mod oauth_provider;
mod user_directory;

#[cfg(test)]
pub use course_store::MockCourseStore;
pub use course_store::{
    CoursePage, CourseQuery, CourseSort, CourseStore, CourseStoreError, InMemoryCourseStore,
    InvalidCourseSort,
};
#[cfg(test)]
pub use enrollment_store::MockEnrollmentStore;
pub use enrollment_store::{
    EnrollOutcome, EnrollmentStore, EnrollmentStoreError, InMemoryEnrollmentStore,
};
#[cfg(test)]
pub use oauth_provider::MockOAuthProvider;
pub use oauth_provider::{FixtureOAuthProvider, OAuthProfile, OAuthProvider, OAuthProviderError};
#[cfg(test)]
pub use user_directory::MockUserDirectory;
pub use user_directory::{InMemoryUserDirectory, UserDirectory, UserDirectoryError};
