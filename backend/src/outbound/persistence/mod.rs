//! PostgreSQL persistence adapters for the domain ports.
//!
//! Each adapter owns one table and implements the matching driven port. The
//! row structs and error translation live in private modules; only the
//! adapters and the pool are exported.

mod diesel_course_store;
mod diesel_enrollment_store;
mod diesel_user_directory;
mod error_map;
mod models;
mod pool;
pub mod schema;

pub use diesel_course_store::DieselCourseStore;
pub use diesel_enrollment_store::DieselEnrollmentStore;
pub use diesel_user_directory::DieselUserDirectory;
pub use pool::{DbPool, PoolConfig, PoolError};
