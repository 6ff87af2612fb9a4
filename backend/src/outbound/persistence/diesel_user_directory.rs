//! Diesel-backed implementation of the user directory port.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::RunQueryDsl;

use crate::domain::ports::{UserDirectory, UserDirectoryError};
use crate::domain::user::{ExternalId, Role, User, UserId};

use super::error_map::{map_diesel_error, map_pool_error};
use super::models::{NewUserRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// User directory backed by the `users` table.
#[derive(Clone)]
pub struct DieselUserDirectory {
    pool: DbPool,
}

impl DieselUserDirectory {
    /// Create a directory using the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> UserDirectoryError {
    map_pool_error(error, UserDirectoryError::connection)
}

fn diesel_error(error: DieselError) -> UserDirectoryError {
    map_diesel_error(
        error,
        UserDirectoryError::query,
        UserDirectoryError::connection,
    )
}

/// Inserts hit the unique indexes on `email` and `external_id`; report those
/// as duplicates rather than generic query failures.
fn insert_error(error: DieselError) -> UserDirectoryError {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            UserDirectoryError::duplicate(info.message().to_owned())
        }
        other => diesel_error(other),
    }
}

fn into_user(row: UserRow) -> Result<User, UserDirectoryError> {
    User::try_from(row).map_err(|error| UserDirectoryError::query(error.to_string()))
}

#[async_trait]
impl UserDirectory for DieselUserDirectory {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row: Option<UserRow> = users::table
            .find(id.as_uuid())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;
        row.map(into_user).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row: Option<UserRow> = users::table
            .filter(users::external_id.eq(external_id.as_ref()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;
        row.map(into_user).transpose()
    }

    async fn insert(&self, user: &User) -> Result<(), UserDirectoryError> {
        let row = NewUserRow::from_user(user).ok_or_else(|| {
            UserDirectoryError::query("cannot insert a user without an external id")
        })?;
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        diesel::insert_into(users::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(insert_error)?;
        Ok(())
    }

    async fn update_role(
        &self,
        id: &UserId,
        role: Role,
    ) -> Result<Option<User>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row: Option<UserRow> = diesel::update(users::table.find(id.as_uuid()))
            .set((
                users::role.eq(role.as_str()),
                users::updated_at.eq(Utc::now()),
            ))
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;
        row.map(into_user).transpose()
    }

    async fn list(&self) -> Result<Vec<User>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows: Vec<UserRow> = users::table
            .order(users::created_at.asc())
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows.into_iter().map(into_user).collect()
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows: Vec<UserRow> = users::table
            .filter(users::role.eq(role.as_str()))
            .order(users::created_at.asc())
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows.into_iter().map(into_user).collect()
    }
}
