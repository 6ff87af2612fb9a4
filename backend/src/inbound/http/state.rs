//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    CourseStore, EnrollmentStore, FixtureOAuthProvider, InMemoryCourseStore,
    InMemoryEnrollmentStore, InMemoryUserDirectory, OAuthProvider, UserDirectory,
};
use crate::domain::{AccessControl, CourseCatalog, EnrollmentGuard, LoginFlow};

/// Parameter object bundling the port implementations behind the handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub directory: Arc<dyn UserDirectory>,
    pub courses: Arc<dyn CourseStore>,
    pub enrollments: Arc<dyn EnrollmentStore>,
    pub oauth: Arc<dyn OAuthProvider>,
}

impl HttpStatePorts {
    /// In-memory ports with the fixture OAuth provider, for tests and
    /// database-less development runs.
    pub fn in_memory() -> Self {
        Self {
            directory: Arc::new(InMemoryUserDirectory::new()),
            courses: Arc::new(InMemoryCourseStore::new()),
            enrollments: Arc::new(InMemoryEnrollmentStore::new()),
            oauth: Arc::new(FixtureOAuthProvider::default()),
        }
    }
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub access: AccessControl,
    pub login: LoginFlow,
    pub catalog: CourseCatalog,
    pub enrollment_guard: EnrollmentGuard,
    pub directory: Arc<dyn UserDirectory>,
    pub enrollments: Arc<dyn EnrollmentStore>,
    /// Shared secret gating the public analytics endpoint; `None` disables it.
    pub analytics_key: Option<String>,
}

impl HttpState {
    /// Construct state from a ports bundle, wiring the domain services.
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            directory,
            courses,
            enrollments,
            oauth,
        } = ports;
        Self {
            access: AccessControl::new(Arc::clone(&directory)),
            login: LoginFlow::new(oauth, Arc::clone(&directory)),
            catalog: CourseCatalog::new(
                Arc::clone(&courses),
                Arc::clone(&enrollments),
                Arc::clone(&directory),
            ),
            enrollment_guard: EnrollmentGuard::new(courses, Arc::clone(&enrollments)),
            directory,
            enrollments,
            analytics_key: None,
        }
    }

    /// Attach the shared secret for the public analytics endpoint.
    #[must_use]
    pub fn with_analytics_key(mut self, key: impl Into<String>) -> Self {
        self.analytics_key = Some(key.into());
        self
    }
}
