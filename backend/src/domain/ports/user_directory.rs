//! Driven port for user persistence: the user directory.
//!
//! Access control, login, and the users API all resolve identities through
//! this port so handlers and services never import outbound persistence
//! concerns.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::user::{ExternalId, Role, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user directory adapters.
    pub enum UserDirectoryError {
        /// Directory connection could not be established.
        Connection => "user directory connection failed: {message}",
        /// Query or mutation failed during execution.
        Query => "user directory query failed: {message}",
        /// A unique column (email or external id) already holds this value.
        Duplicate => "user directory uniqueness violated: {message}",
    }
}

/// Port for reading and mutating user records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserDirectoryError>;

    /// Fetch a user by the OAuth provider's subject id.
    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, UserDirectoryError>;

    /// Persist a newly created user.
    async fn insert(&self, user: &User) -> Result<(), UserDirectoryError>;

    /// Replace a user's role, returning the updated record when it exists.
    async fn update_role(
        &self,
        id: &UserId,
        role: Role,
    ) -> Result<Option<User>, UserDirectoryError>;

    /// List every user, ordered by creation time.
    async fn list(&self) -> Result<Vec<User>, UserDirectoryError>;

    /// List users holding the given role, ordered by creation time.
    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, UserDirectoryError>;
}

/// In-memory directory used by tests and database-less development runs.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: Mutex<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory preloaded with the given users.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let directory = Self::new();
        {
            let mut guard = directory.lock();
            for user in users {
                guard.insert(*user.id(), user);
            }
        }
        directory
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, User>> {
        self.users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn sorted(mut users: Vec<User>) -> Vec<User> {
        users.sort_by_key(|user| (user.created_at(), *user.id().as_uuid()));
        users
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserDirectoryError> {
        Ok(self.lock().get(id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, UserDirectoryError> {
        Ok(self
            .lock()
            .values()
            .find(|user| user.external_id() == Some(external_id))
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), UserDirectoryError> {
        let mut guard = self.lock();
        let duplicate = guard.values().any(|existing| {
            existing.email() == user.email()
                || (existing.external_id().is_some()
                    && existing.external_id() == user.external_id())
        });
        if duplicate {
            return Err(UserDirectoryError::duplicate(format!(
                "user with email {} already exists",
                user.email()
            )));
        }
        guard.insert(*user.id(), user.clone());
        Ok(())
    }

    async fn update_role(
        &self,
        id: &UserId,
        role: Role,
    ) -> Result<Option<User>, UserDirectoryError> {
        let mut guard = self.lock();
        let Some(user) = guard.get(id).cloned() else {
            return Ok(None);
        };
        let updated = user.with_role(role, chrono::Utc::now());
        guard.insert(*id, updated.clone());
        Ok(Some(updated))
    }

    async fn list(&self) -> Result<Vec<User>, UserDirectoryError> {
        Ok(Self::sorted(self.lock().values().cloned().collect()))
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, UserDirectoryError> {
        Ok(Self::sorted(
            self.lock()
                .values()
                .filter(|user| user.role() == role)
                .cloned()
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use chrono::Utc;
    use rstest::rstest;

    use super::*;
    use crate::domain::user::{DisplayName, Email, UserDraft};

    fn user(email: &str, external: &str, role: Role) -> User {
        let now = Utc::now();
        User::new(UserDraft {
            id: UserId::random(),
            email: Email::new(email).expect("valid email"),
            external_id: ExternalId::new(external).expect("valid external id"),
            display_name: DisplayName::new("Test User").expect("valid name"),
            role,
            created_at: now,
            updated_at: now,
        })
    }

    #[rstest]
    #[tokio::test]
    async fn insert_then_find_by_external_id() {
        let directory = InMemoryUserDirectory::new();
        let alice = user("alice@example.com", "g-1", Role::Student);
        directory.insert(&alice).await.expect("insert succeeds");

        let found = directory
            .find_by_external_id(&ExternalId::new("g-1").expect("valid id"))
            .await
            .expect("lookup succeeds")
            .expect("user present");
        assert_eq!(found.id(), alice.id());
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let directory = InMemoryUserDirectory::new();
        directory
            .insert(&user("alice@example.com", "g-1", Role::Student))
            .await
            .expect("first insert succeeds");
        let err = directory
            .insert(&user("alice@example.com", "g-2", Role::Student))
            .await
            .expect_err("duplicate email must fail");
        assert!(matches!(err, UserDirectoryError::Duplicate { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn update_role_on_missing_user_returns_none() {
        let directory = InMemoryUserDirectory::new();
        let updated = directory
            .update_role(&UserId::random(), Role::Admin)
            .await
            .expect("update succeeds");
        assert!(updated.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn list_by_role_filters() {
        let directory = InMemoryUserDirectory::with_users([
            user("s@example.com", "g-1", Role::Student),
            user("t@example.com", "g-2", Role::Teacher),
            user("a@example.com", "g-3", Role::Admin),
        ]);
        let teachers = directory
            .list_by_role(Role::Teacher)
            .await
            .expect("list succeeds");
        assert_eq!(teachers.len(), 1);
        assert_eq!(teachers[0].email().as_ref(), "t@example.com");
    }
}
