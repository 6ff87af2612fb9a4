//! HTTP inbound adapter exposing REST endpoints.

pub mod analytics;
pub mod auth;
pub mod courses;
pub mod enrollments;
pub mod error;
pub mod guard;
pub mod health;
pub mod session;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;

pub use error::ApiResult;
