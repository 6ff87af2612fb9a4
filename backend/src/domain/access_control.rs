//! Role-based access control decisions.
//!
//! Every protected operation runs the same two-step check: resolve the
//! session identity to a user (`authenticate`), then compare the user's role
//! against the operation's allowed set (`authorize`). The first failure
//! short-circuits; `authorize` is never evaluated for an absent user.

use std::sync::Arc;

use serde_json::json;

use crate::domain::error::Error;
use crate::domain::ports::{UserDirectory, UserDirectoryError};
use crate::domain::user::{Role, User, UserId};

/// Denials and infrastructure failures raised by access checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// No session identity was presented.
    #[error("authentication required")]
    Unauthenticated,
    /// The session references a user that no longer exists; the caller must
    /// clear the session as a side effect.
    #[error("session user no longer exists")]
    StaleSession,
    /// Authenticated, but the role is not in the allowed set.
    #[error("access denied; required roles: {required}")]
    Forbidden { required: String },
    /// The user directory could not answer.
    #[error(transparent)]
    Directory(#[from] UserDirectoryError),
}

impl From<AccessError> for Error {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => Error::unauthorized("Authentication required")
                .with_details(json!({ "reason": "unauthenticated" })),
            AccessError::StaleSession => Error::unauthorized("User not found")
                .with_details(json!({ "reason": "unauthenticated" })),
            AccessError::Forbidden { required } => {
                Error::forbidden(format!("Access denied. Required roles: {required}"))
                    .with_details(json!({ "reason": "forbidden" }))
            }
            AccessError::Directory(inner) => match inner {
                UserDirectoryError::Connection { message } => {
                    Error::service_unavailable(format!("user directory unavailable: {message}"))
                }
                UserDirectoryError::Query { message }
                | UserDirectoryError::Duplicate { message } => {
                    Error::internal(format!("user directory error: {message}"))
                }
            },
        }
    }
}

/// Decide whether `user` may perform an operation restricted to
/// `allowed_roles`.
///
/// Deterministic and side-effect free: allowed iff the user's role is a
/// member of the set, by exact enum comparison. An empty set always denies.
pub fn authorize(user: &User, allowed_roles: &[Role]) -> Result<(), AccessError> {
    if allowed_roles.contains(&user.role()) {
        Ok(())
    } else {
        Err(AccessError::Forbidden {
            required: allowed_roles
                .iter()
                .map(Role::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// Access-control service resolving session identities through the directory.
#[derive(Clone)]
pub struct AccessControl {
    directory: Arc<dyn UserDirectory>,
}

impl AccessControl {
    /// Create a service backed by the given user directory.
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve the session identity to a user record.
    ///
    /// Within one session lifetime this is an idempotent read: repeated calls
    /// return the same user. Fails [`AccessError::Unauthenticated`] without a
    /// directory lookup when no identity is bound, and
    /// [`AccessError::StaleSession`] when the referenced user vanished.
    pub async fn authenticate(&self, session_user: Option<UserId>) -> Result<User, AccessError> {
        let Some(user_id) = session_user else {
            return Err(AccessError::Unauthenticated);
        };
        self.directory
            .find_by_id(&user_id)
            .await?
            .ok_or(AccessError::StaleSession)
    }

    /// Composed check used by every protected operation: authenticate, then
    /// authorize against `allowed_roles`, denying on the first failure.
    pub async fn require_any(
        &self,
        session_user: Option<UserId>,
        allowed_roles: &[Role],
    ) -> Result<User, AccessError> {
        let user = self.authenticate(session_user).await?;
        authorize(&user, allowed_roles)?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use chrono::Utc;
    use rstest::rstest;

    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::ports::{InMemoryUserDirectory, MockUserDirectory};
    use crate::domain::user::{DisplayName, Email, ExternalId, UserDraft};

    fn user_with_role(role: Role) -> User {
        let now = Utc::now();
        User::new(UserDraft {
            id: UserId::random(),
            email: Email::new("user@example.com").expect("valid email"),
            external_id: ExternalId::new("g-1").expect("valid id"),
            display_name: DisplayName::new("Test User").expect("valid name"),
            role,
            created_at: now,
            updated_at: now,
        })
    }

    #[test]
    fn authorize_allows_iff_role_is_member() {
        // Exhaustive over every role and every subset of the role set.
        for role in Role::ALL {
            let user = user_with_role(role);
            for mask in 0u8..(1 << Role::ALL.len()) {
                let allowed: Vec<Role> = Role::ALL
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, r)| r)
                    .collect();
                let decision = authorize(&user, &allowed);
                assert_eq!(
                    decision.is_ok(),
                    allowed.contains(&role),
                    "role {role} against {allowed:?}"
                );
            }
        }
    }

    #[rstest]
    fn empty_role_set_always_denies() {
        for role in Role::ALL {
            let user = user_with_role(role);
            assert!(matches!(
                authorize(&user, &[]),
                Err(AccessError::Forbidden { .. })
            ));
        }
    }

    #[rstest]
    fn student_is_forbidden_from_teacher_admin_operations() {
        let student = user_with_role(Role::Student);
        let err = authorize(&student, &[Role::Teacher, Role::Admin]).expect_err("must deny");
        let error: Error = err.into();
        assert_eq!(error.code(), ErrorCode::Forbidden);
    }

    #[rstest]
    #[tokio::test]
    async fn missing_session_short_circuits_without_directory_lookup() {
        let mut directory = MockUserDirectory::new();
        directory.expect_find_by_id().never();
        let control = AccessControl::new(Arc::new(directory));

        let err = control
            .require_any(None, &[Role::Admin])
            .await
            .expect_err("must deny");
        assert_eq!(err, AccessError::Unauthenticated);
    }

    #[rstest]
    #[tokio::test]
    async fn vanished_user_is_a_stale_session() {
        let control = AccessControl::new(Arc::new(InMemoryUserDirectory::new()));
        let err = control
            .authenticate(Some(UserId::random()))
            .await
            .expect_err("must deny");
        assert_eq!(err, AccessError::StaleSession);
    }

    #[rstest]
    #[tokio::test]
    async fn authenticate_is_an_idempotent_read() {
        let user = user_with_role(Role::Teacher);
        let control = AccessControl::new(Arc::new(InMemoryUserDirectory::with_users([
            user.clone()
        ])));

        let first = control
            .authenticate(Some(*user.id()))
            .await
            .expect("resolves");
        let second = control
            .authenticate(Some(*user.id()))
            .await
            .expect("resolves");
        assert_eq!(first, second);
    }

    #[rstest]
    #[tokio::test]
    async fn require_any_returns_the_authenticated_user() {
        let admin = user_with_role(Role::Admin);
        let control =
            AccessControl::new(Arc::new(InMemoryUserDirectory::with_users([admin.clone()])));

        let resolved = control
            .require_any(Some(*admin.id()), &[Role::Admin])
            .await
            .expect("allowed");
        assert_eq!(resolved.id(), admin.id());
    }
}
