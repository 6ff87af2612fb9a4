//! Domain layer: entities, ports, and the services behind the HTTP adapter.
//!
//! Nothing in this module imports actix, diesel, or reqwest. Adapters plug in
//! through the traits under [`ports`].

pub mod access_control;
pub mod course;
pub mod course_catalog;
pub mod enrollment;
pub mod enrollment_guard;
pub mod error;
pub mod login;
pub mod ports;
pub mod user;

pub use access_control::{AccessControl, AccessError, authorize};
pub use course::{Course, CourseChanges, CourseId};
pub use course_catalog::{CourseAnalytics, CourseCatalog, NewCourse};
pub use enrollment::{Enrollment, EnrollmentStatus};
pub use enrollment_guard::{EnrollmentError, EnrollmentGuard};
pub use error::{Error, ErrorCode};
pub use login::{LoginError, LoginFlow};
pub use user::{Role, User, UserId};
